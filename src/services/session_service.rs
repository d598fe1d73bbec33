//! 会话管理 - 业务能力层
//!
//! 持有唯一的浏览器会话，负责打开入口页面、识别登录页，
//! 并在需要时暂停整个进程等待人工登录（每个进程最多一次）。

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{Console, PageDriver};

static LOGIN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(signup|sign-up|signin|sign-in|login)").expect("登录页正则无效"));

/// URL 是否指向登录或注册页
pub fn is_login_url(url: &str) -> bool {
    LOGIN_URL.is_match(url)
}

/// 取出 URL 的主机部分
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

/// 会话管理器
pub struct SessionManager<D> {
    driver: Arc<D>,
    target_url: String,
    entry_timeout: Duration,
    settle: Duration,
    login_settle: Duration,
    ready: bool,
    login_prompted: bool,
}

impl<D: PageDriver> SessionManager<D> {
    /// 创建会话管理器
    ///
    /// 浏览器由调用方启动，这里只负责让它进入可用状态。
    pub fn new(driver: Arc<D>, config: &Config) -> Self {
        Self {
            driver,
            target_url: config.target_url.clone(),
            entry_timeout: config.entry_navigation_timeout(),
            settle: config.settle(),
            login_settle: config.login_settle(),
            ready: false,
            login_prompted: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// 确保会话可用
    ///
    /// 首次调用打开入口页面并处理登录；之后只做轻量检查，
    /// 页面偏离目标站点时重新导航。
    pub async fn ensure_ready<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<()> {
        if self.ready {
            return self.recheck().await;
        }

        info!("📍 正在打开 {}", self.target_url);
        self.open_entry().await?;

        let url = self.driver.current_url().await?;
        info!("当前 URL: {}", url);

        if is_login_url(&url) {
            self.wait_for_login(console).await?;
        } else {
            info!("✅ 已登录");
        }

        self.ready = true;
        Ok(())
    }

    /// 刷新当前页面
    pub async fn reload(&self) -> Result<()> {
        info!("🔄 正在刷新页面...");
        self.driver.reload().await.context("刷新页面失败")?;
        sleep(self.settle).await;
        info!("✅ 页面已刷新");
        Ok(())
    }

    /// 关闭浏览器（尽力而为）
    pub async fn close(&self) {
        info!("👋 正在关闭浏览器...");
        if let Err(e) = self.driver.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }
    }

    async fn open_entry(&self) -> Result<()> {
        match self.driver.goto(&self.target_url, self.entry_timeout).await {
            Ok(()) => {}
            Err(e) if !e.is_fatal() => warn!("⚠️ {}，继续执行", e),
            Err(e) => return Err(e).context("打开入口页面失败"),
        }
        sleep(self.settle).await;
        Ok(())
    }

    async fn wait_for_login<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<()> {
        if self.login_prompted {
            warn!("⚠️ 会话再次跳转到登录页，本进程不再等待人工登录");
            return Ok(());
        }
        self.login_prompted = true;

        warn!("{}", "=".repeat(60));
        warn!("⚠️ 需要登录：请在浏览器窗口中手动登录");
        warn!("{}", "=".repeat(60));
        console
            .read_line("登录完成并看到应用页面后，按回车继续...")
            .await?;

        sleep(self.login_settle).await;
        info!("✅ 登录完成");
        Ok(())
    }

    async fn recheck(&mut self) -> Result<()> {
        let url = self.driver.current_url().await?;
        let on_target = host_of(&url) == host_of(&self.target_url);

        if !on_target || is_login_url(&url) {
            warn!("⚠️ 页面不在目标站点 ({})，重新导航...", url);
            self.open_entry().await?;
        }
        Ok(())
    }
}
