//! 定位回退执行器 - 基础设施层
//!
//! 给定一条候选链和一个动作，按顺序逐个候选等待可见元素，
//! 第一个命中的候选负责执行动作；全部未命中时报告 `LocatorExhausted`。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::driver::{ElementRef, PageDriver};
use crate::infrastructure::locator::{Candidate, LocatorSpec};

/// 对命中元素执行的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click,
    /// 全选后输入
    Fill(String),
    /// 只等待出现，不做操作
    WaitAppear,
    /// 点击触发元素并把文件交给拦截到的文件选择器
    Upload { file: PathBuf, chooser_timeout: Duration },
}

/// 执行成功时命中的候选
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Performed {
    pub index: usize,
    pub description: String,
    pub element: ElementRef,
}

/// 定位回退执行器
///
/// 不回溯：候选一旦命中，后续动作的失败直接作为步骤失败返回，
/// 不会再去尝试下一个候选。
pub struct ActionExecutor<D> {
    driver: Arc<D>,
    screenshot_dir: PathBuf,
}

impl<D: PageDriver> ActionExecutor<D> {
    pub fn new(driver: Arc<D>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// 按顺序尝试候选并执行动作
    ///
    /// # 参数
    /// - `action`: 要执行的动作
    /// - `spec`: 候选链
    /// - `timeout`: 每个候选的等待上限
    pub async fn perform(
        &self,
        action: &Action,
        spec: &LocatorSpec,
        timeout: Duration,
    ) -> AutomationResult<Performed> {
        for (index, candidate) in spec.candidates().iter().enumerate() {
            debug!(
                "   [{}] 尝试候选 {}/{}: {}",
                spec.name(),
                index + 1,
                spec.len(),
                candidate.description
            );

            let Some(element) = self.driver.wait_visible(&candidate.predicate, timeout).await? else {
                continue;
            };

            self.apply(action, &element).await?;
            info!("   ✅ [{}] 命中: {}", spec.name(), candidate.description);

            return Ok(Performed {
                index,
                description: candidate.description.clone(),
                element,
            });
        }

        warn!("   ❌ [{}] 所有 {} 个候选均未命中", spec.name(), spec.len());
        Err(AutomationError::LocatorExhausted {
            step: spec.name().to_string(),
            tried: spec.len(),
        })
    }

    /// 等待某个候选对应的元素消失
    pub async fn wait_gone(&self, candidate: &Candidate, timeout: Duration) -> AutomationResult<bool> {
        self.driver.wait_hidden(&candidate.predicate, timeout).await
    }

    /// 保存诊断截图到固定路径 `<截图目录>/debug-<步骤名>.png`
    ///
    /// 截图失败只记录警告。
    pub async fn capture_diagnostic(&self, step: &str) -> Option<PathBuf> {
        let path = diagnostic_path(&self.screenshot_dir, step);

        if let Err(e) = tokio::fs::create_dir_all(&self.screenshot_dir).await {
            warn!("⚠️ 无法创建截图目录 {}: {}", self.screenshot_dir.display(), e);
            return None;
        }

        match self.driver.screenshot(&path).await {
            Ok(()) => {
                info!("📸 诊断截图已保存: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("⚠️ 诊断截图失败: {}", e);
                None
            }
        }
    }

    async fn apply(&self, action: &Action, element: &ElementRef) -> AutomationResult<()> {
        match action {
            Action::Click => self.driver.click(element).await,
            Action::Fill(text) => self.driver.fill(element, text).await,
            Action::WaitAppear => Ok(()),
            Action::Upload {
                file,
                chooser_timeout,
            } => self.driver.choose_file(element, file, *chooser_timeout).await,
        }
    }
}

/// 步骤的诊断截图路径
pub fn diagnostic_path(dir: &Path, step: &str) -> PathBuf {
    let slug: String = step
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    dir.join(format!("debug-{}.png", slug))
}
