use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::infrastructure::{CdpDriver, JsExecutor};

/// 启动绑定持久化配置目录的可见浏览器
///
/// 登录状态保存在 `profile_dir` 中，下次启动无需重新登录。
pub async fn launch_persistent_browser(config: &Config) -> Result<(Browser, Page)> {
    info!("🎭 启动浏览器（持久化会话）...");
    debug!("配置目录: {}", config.profile_dir);

    std::fs::create_dir_all(&config.profile_dir)
        .with_context(|| format!("无法创建配置目录: {}", config.profile_dir))?;

    let mut builder = BrowserConfig::builder()
        .with_head()
        .user_data_dir(Path::new(&config.profile_dir))
        .window_size(config.viewport_width, config.viewport_height + 150)
        .viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..Default::default()
        })
        // 入口导航由外层计时器控制，协议请求超时不能比它短
        .request_timeout(config.entry_navigation_timeout() + Duration::from_secs(5))
        .args(vec!["--disable-dev-shm-usage", "--no-first-run"]);

    if let Some(executable) = &config.chrome_executable {
        builder = builder.chrome_executable(Path::new(executable));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    // 持久化配置启动时通常已带一个标签页，只复用第一个
    let pages = browser.pages().await?;
    let page = match pages.into_iter().next() {
        Some(page) => page,
        None => browser.new_page("about:blank").await.map_err(|e| {
            error!("创建页面失败: {}", e);
            anyhow!("创建页面失败: {}", e)
        })?,
    };

    info!("✅ 浏览器已启动");
    Ok((browser, page))
}

/// 启动浏览器并包装为 `CdpDriver`
pub async fn launch_driver(config: &Config) -> Result<CdpDriver> {
    let (browser, page) = launch_persistent_browser(config).await?;
    Ok(CdpDriver::new(
        browser,
        JsExecutor::new(page),
        config.poll_interval(),
    ))
}
