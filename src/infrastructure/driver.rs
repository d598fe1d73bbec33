//! 浏览器能力接口 - 基础设施层
//!
//! `PageDriver` 是上层能看到的全部浏览器能力：等待元素、点击、输入、
//! 拦截文件选择器、导航、截图。生产实现是基于 chromiumoxide 的 `CdpDriver`。

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Browser;
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::locator::{Predicate, REF_ATTRIBUTE};

/// 已定位元素的句柄
///
/// 只在定位之后、下一次页面跳转之前有效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    fn selector(&self) -> String {
        format!("[{}=\"{}\"]", REF_ATTRIBUTE, self.0)
    }
}

/// 浏览器页面能力
///
/// 同一时刻只有一个活动页面，调用方保证顺序调用。
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 等待谓词命中一个可见元素，超时返回 `None`
    async fn wait_visible(
        &self,
        predicate: &Predicate,
        timeout: Duration,
    ) -> AutomationResult<Option<ElementRef>>;

    /// 等待谓词不再命中可见元素，超时返回 `false`
    async fn wait_hidden(&self, predicate: &Predicate, timeout: Duration) -> AutomationResult<bool>;

    async fn click(&self, element: &ElementRef) -> AutomationResult<()>;

    /// 全选原有内容后输入新文本
    async fn fill(&self, element: &ElementRef, text: &str) -> AutomationResult<()>;

    /// 先挂好文件选择器拦截再点击触发元素，然后把文件交给被拦截的选择器
    async fn choose_file(
        &self,
        trigger: &ElementRef,
        file: &Path,
        timeout: Duration,
    ) -> AutomationResult<()>;

    async fn goto(&self, url: &str, timeout: Duration) -> AutomationResult<()>;

    async fn current_url(&self) -> AutomationResult<String>;

    async fn reload(&self) -> AutomationResult<()>;

    /// 整页截图
    async fn screenshot(&self, path: &Path) -> AutomationResult<()>;

    async fn close(&self) -> AutomationResult<()>;
}

#[derive(Debug, Deserialize)]
struct ResolveResult {
    #[serde(rename = "ref")]
    element_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VisibilityResult {
    visible: bool,
}

/// 导航失败时的错误归类
///
/// chromiumoxide 自身的请求超时可能先于外层计时器触发，两者都按导航超时处理。
pub(crate) fn navigation_error(err: CdpError, url: &str, timeout: Duration) -> AutomationError {
    match err {
        CdpError::Timeout => AutomationError::NavigationTimeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        },
        other => other.into(),
    }
}

/// 基于 chromiumoxide 的实现
pub struct CdpDriver {
    js: JsExecutor,
    browser: Mutex<Browser>,
    poll_interval: Duration,
}

impl CdpDriver {
    pub fn new(browser: Browser, js: JsExecutor, poll_interval: Duration) -> Self {
        Self {
            js,
            browser: Mutex::new(browser),
            poll_interval,
        }
    }

    async fn element(&self, element: &ElementRef) -> AutomationResult<Element> {
        Ok(self.js.page().find_element(element.selector()).await?)
    }

    async fn intercept_and_set(
        &self,
        trigger: &ElementRef,
        file: &Path,
        timeout: Duration,
    ) -> AutomationResult<()> {
        let page = self.js.page();
        let absolute = std::fs::canonicalize(file).map_err(|e| {
            AutomationError::upload_failed(format!("无法访问文件 {}: {}", file.display(), e))
        })?;

        // 监听必须在点击之前建立，否则选择器可能先于拦截弹出
        let mut chooser_events = page.event_listener::<EventFileChooserOpened>().await?;
        self.element(trigger).await?.click().await?;

        let opened = tokio::time::timeout(timeout, chooser_events.next())
            .await
            .map_err(|_| {
                AutomationError::upload_failed(format!(
                    "{} 毫秒内未拦截到文件选择器",
                    timeout.as_millis()
                ))
            })?
            .ok_or_else(|| AutomationError::upload_failed("文件选择器事件流已关闭"))?;

        let backend_node_id = opened
            .backend_node_id
            .clone()
            .ok_or_else(|| AutomationError::upload_failed("文件选择器没有关联的 input 元素"))?;

        let params = SetFileInputFilesParams::builder()
            .files(vec![absolute.to_string_lossy().to_string()])
            .backend_node_id(backend_node_id)
            .build()
            .map_err(AutomationError::upload_failed)?;
        page.execute(params).await?;

        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn wait_visible(
        &self,
        predicate: &Predicate,
        timeout: Duration,
    ) -> AutomationResult<Option<ElementRef>> {
        let script = predicate.resolve_script();
        let deadline = Instant::now() + timeout;

        loop {
            match self.js.eval_as::<ResolveResult>(script.as_str()).await {
                Ok(ResolveResult {
                    element_ref: Some(id),
                }) => return Ok(Some(ElementRef::new(id))),
                Ok(_) => {}
                // 页面跳转期间执行上下文会被销毁，继续轮询即可
                Err(e) if e.is_transient() => debug!("定位脚本执行失败，继续等待: {}", e),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn wait_hidden(&self, predicate: &Predicate, timeout: Duration) -> AutomationResult<bool> {
        let script = predicate.visibility_script();
        let deadline = Instant::now() + timeout;

        loop {
            match self.js.eval_as::<VisibilityResult>(script.as_str()).await {
                Ok(VisibilityResult { visible: false }) => return Ok(true),
                Ok(_) => {}
                Err(e) if e.is_transient() => debug!("可见性检测失败，继续等待: {}", e),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn click(&self, element: &ElementRef) -> AutomationResult<()> {
        self.element(element).await?.click().await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> AutomationResult<()> {
        let el = self.element(element).await?;
        el.click().await?;
        el.call_js_fn(
            "function() { this.focus(); if (typeof this.select === 'function') { this.select(); } }",
            false,
        )
        .await?;
        el.type_str(text).await?;
        Ok(())
    }

    async fn choose_file(
        &self,
        trigger: &ElementRef,
        file: &Path,
        timeout: Duration,
    ) -> AutomationResult<()> {
        let page = self.js.page();
        page.execute(SetInterceptFileChooserDialogParams::new(true))
            .await?;

        let result = self.intercept_and_set(trigger, file, timeout).await;

        if let Err(e) = page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await
        {
            warn!("⚠️ 关闭文件选择器拦截失败: {}", e);
        }

        result
    }

    async fn goto(&self, url: &str, timeout: Duration) -> AutomationResult<()> {
        match tokio::time::timeout(timeout, self.js.page().goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(navigation_error(e, url, timeout)),
            Err(_) => Err(navigation_error(CdpError::Timeout, url, timeout)),
        }
    }

    async fn current_url(&self) -> AutomationResult<String> {
        Ok(self.js.page().url().await?.unwrap_or_default())
    }

    async fn reload(&self) -> AutomationResult<()> {
        self.js.page().reload().await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> AutomationResult<()> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.js.page().save_screenshot(params, path).await?;
        Ok(())
    }

    async fn close(&self) -> AutomationResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        browser
            .wait()
            .await
            .map_err(|e| AutomationError::Unknown(format!("等待浏览器退出失败: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_during_goto_is_navigation_timeout() {
        let err = navigation_error(
            CdpError::Timeout,
            "https://app.coastapp.com/",
            Duration::from_secs(60),
        );
        assert!(matches!(err, AutomationError::NavigationTimeout { secs: 60, .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_other_goto_failures_keep_their_kind() {
        let closed = navigation_error(CdpError::NoResponse, "https://x", Duration::from_secs(1));
        assert!(matches!(closed, AutomationError::Unknown(_)));
        assert!(closed.is_fatal());

        let refused = navigation_error(
            CdpError::ChromeMessage("net::ERR_CONNECTION_REFUSED".to_string()),
            "https://x",
            Duration::from_secs(1),
        );
        assert!(refused.is_transient());
        assert_eq!(refused.to_string(), "net::ERR_CONNECTION_REFUSED");
    }
}
