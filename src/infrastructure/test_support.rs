//! 单元测试用的内存浏览器

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::driver::{navigation_error, ElementRef, PageDriver};
use crate::infrastructure::locator::Predicate;

#[derive(Default)]
struct FakeState {
    show_all: bool,
    visible: HashSet<String>,
    hidden: HashSet<String>,
    stuck: HashSet<String>,
    exploding: HashSet<String>,
    failing_uploads: HashSet<String>,
    redirect_to: Option<String>,
    goto_times_out: bool,
    goto_request_times_out: bool,
    url: String,
    probes: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    uploads: Vec<PathBuf>,
    screenshots: Vec<PathBuf>,
    gotos: Vec<String>,
    reloads: usize,
    closed: bool,
}

/// 以谓词描述作为元素身份的假浏览器
pub(crate) struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub(crate) fn show_all(&self) {
        self.with(|s| s.show_all = true);
    }

    pub(crate) fn show(&self, description: &str) {
        self.with(|s| s.visible.insert(description.to_string()));
    }

    pub(crate) fn hide(&self, description: &str) {
        self.with(|s| s.hidden.insert(description.to_string()));
    }

    /// 元素出现后永不消失
    pub(crate) fn stick(&self, description: &str) {
        self.with(|s| s.stuck.insert(description.to_string()));
    }

    /// 探测该元素时返回自动化层异常
    pub(crate) fn explode_on(&self, description: &str) {
        self.with(|s| s.exploding.insert(description.to_string()));
    }

    pub(crate) fn fail_upload_for(&self, file_name: &str) {
        self.with(|s| s.failing_uploads.insert(file_name.to_string()));
    }

    /// 之后的所有导航都落到该 URL（模拟跳转到登录页）
    pub(crate) fn redirect_to(&self, url: &str) {
        self.with(|s| s.redirect_to = Some(url.to_string()));
    }

    pub(crate) fn set_goto_times_out(&self) {
        self.with(|s| s.goto_times_out = true);
    }

    /// 导航时协议层请求超时（先于外层计时器）
    pub(crate) fn set_goto_request_times_out(&self) {
        self.with(|s| s.goto_request_times_out = true);
    }

    pub(crate) fn set_url(&self, url: &str) {
        self.with(|s| s.url = url.to_string());
    }

    pub(crate) fn probes(&self) -> Vec<String> {
        self.with(|s| s.probes.clone())
    }

    pub(crate) fn clicks(&self) -> Vec<String> {
        self.with(|s| s.clicks.clone())
    }

    pub(crate) fn fills(&self) -> Vec<(String, String)> {
        self.with(|s| s.fills.clone())
    }

    pub(crate) fn uploads(&self) -> Vec<PathBuf> {
        self.with(|s| s.uploads.clone())
    }

    pub(crate) fn screenshots(&self) -> Vec<PathBuf> {
        self.with(|s| s.screenshots.clone())
    }

    pub(crate) fn gotos(&self) -> Vec<String> {
        self.with(|s| s.gotos.clone())
    }

    pub(crate) fn reloads(&self) -> usize {
        self.with(|s| s.reloads)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.with(|s| s.closed)
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn wait_visible(
        &self,
        predicate: &Predicate,
        _timeout: Duration,
    ) -> AutomationResult<Option<ElementRef>> {
        let description = predicate.to_string();
        self.with(|s| {
            s.probes.push(description.clone());
            if s.exploding.contains(&description) {
                return Err(AutomationError::Unknown("Target page, context or browser has been closed".to_string()));
            }
            let visible = !s.hidden.contains(&description)
                && (s.show_all || s.visible.contains(&description));
            Ok(visible.then(|| ElementRef::new(description.clone())))
        })
    }

    async fn wait_hidden(&self, predicate: &Predicate, _timeout: Duration) -> AutomationResult<bool> {
        let description = predicate.to_string();
        Ok(self.with(|s| !s.stuck.contains(&description)))
    }

    async fn click(&self, element: &ElementRef) -> AutomationResult<()> {
        self.with(|s| s.clicks.push(element.id().to_string()));
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> AutomationResult<()> {
        self.with(|s| s.fills.push((element.id().to_string(), text.to_string())));
        Ok(())
    }

    async fn choose_file(
        &self,
        _trigger: &ElementRef,
        file: &Path,
        _timeout: Duration,
    ) -> AutomationResult<()> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.with(|s| {
            if s.failing_uploads.contains(&file_name) {
                return Err(AutomationError::upload_failed("10 毫秒内未拦截到文件选择器"));
            }
            s.uploads.push(file.to_path_buf());
            Ok(())
        })
    }

    async fn goto(&self, url: &str, timeout: Duration) -> AutomationResult<()> {
        self.with(|s| {
            s.gotos.push(url.to_string());
            s.url = s.redirect_to.clone().unwrap_or_else(|| url.to_string());
            if s.goto_times_out {
                return Err(AutomationError::NavigationTimeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            if s.goto_request_times_out {
                return Err(navigation_error(CdpError::Timeout, url, timeout));
            }
            Ok(())
        })
    }

    async fn current_url(&self) -> AutomationResult<String> {
        Ok(self.with(|s| s.url.clone()))
    }

    async fn reload(&self) -> AutomationResult<()> {
        self.with(|s| s.reloads += 1);
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> AutomationResult<()> {
        self.with(|s| s.screenshots.push(path.to_path_buf()));
        Ok(())
    }

    async fn close(&self) -> AutomationResult<()> {
        self.with(|s| s.closed = true);
        Ok(())
    }
}
