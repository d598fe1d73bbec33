//! 子表单创建流程 - 流程层
//!
//! 核心职责：定义"创建一个子表单"的完整步骤
//!
//! 状态顺序：
//! Start → PositionedOnTarget → DialogOpen → UploadModeSelected → NameSet
//! → FileAttached → Submitted → Building → Closed
//!
//! 进入子表单页面的导航只在进程内第一次执行，之后的条目直接从
//! `PositionedOnTarget` 开始。

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::{Action, ActionExecutor, LocatorSpec, PageDriver};
use crate::models::{find_pdf_by_name, ItemPayload, WorkItem};
use crate::workflow::item_ctx::ItemCtx;
use crate::workflow::selectors::SubFormSelectors;

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    PositionedOnTarget,
    DialogOpen,
    UploadModeSelected,
    NameSet,
    FileAttached,
    Submitted,
    Building,
    Closed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Start => "Start",
            FlowState::PositionedOnTarget => "PositionedOnTarget",
            FlowState::DialogOpen => "DialogOpen",
            FlowState::UploadModeSelected => "UploadModeSelected",
            FlowState::NameSet => "NameSet",
            FlowState::FileAttached => "FileAttached",
            FlowState::Submitted => "Submitted",
            FlowState::Building => "Building",
            FlowState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// 条目处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// 处理成功
    Success,
    /// 致命步骤失败，条目终止
    Failed { reason: String },
}

/// 单条目处理能力
///
/// 批处理层只依赖这个接口。返回 `Err` 表示自动化层抛出了无法归类的异常，
/// 由批处理层统一转换为失败结果。
#[async_trait]
pub trait ItemProcessor: Send {
    async fn process(&mut self, item: &WorkItem, ctx: &ItemCtx) -> Result<ProcessResult>;
}

/// 某一步骤的失败
struct StepFailure {
    step: String,
    error: AutomationError,
}

fn at(step: &str) -> impl FnOnce(AutomationError) -> StepFailure + '_ {
    move |error| StepFailure {
        step: step.to_string(),
        error,
    }
}

/// 子表单创建流程
///
/// - 持有定位回退执行器和"已就位"标记
/// - 标记只由本流程读写，会话存续期间不重置
/// - 每一步都通过执行器完成，不直接接触页面
pub struct SubFormFlow<D> {
    executor: ActionExecutor<D>,
    selectors: SubFormSelectors,
    positioned: bool,
    state: FlowState,
    pdf_base_dir: String,
    folders: Vec<String>,
    candidate_timeout: Duration,
    navigation_timeout: Duration,
    upload_timeout: Duration,
    build_appear_timeout: Duration,
    build_timeout: Duration,
    settle: Duration,
}

impl<D: PageDriver> SubFormFlow<D> {
    /// 创建新的子表单流程
    pub fn new(driver: Arc<D>, config: &Config) -> Self {
        Self::with_selectors(driver, config, SubFormSelectors::default())
    }

    /// 使用自定义定位链创建
    pub fn with_selectors(driver: Arc<D>, config: &Config, selectors: SubFormSelectors) -> Self {
        Self {
            executor: ActionExecutor::new(driver, &config.screenshot_dir),
            selectors,
            positioned: false,
            state: FlowState::Start,
            pdf_base_dir: config.pdf_base_dir.clone(),
            folders: config.folders.clone(),
            candidate_timeout: config.candidate_timeout(),
            navigation_timeout: config.navigation_candidate_timeout(),
            upload_timeout: config.upload_timeout(),
            build_appear_timeout: config.build_appear_timeout(),
            build_timeout: config.build_timeout(),
            settle: config.settle(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_positioned(&self) -> bool {
        self.positioned
    }

    /// 创建一个子表单
    ///
    /// # 参数
    /// - `name`: 表单名称
    /// - `description`: 可选描述，填写失败只记录警告
    /// - `file`: 要上传的 PDF
    ///
    /// # 返回
    /// 致命步骤失败返回 `Ok(Failed)`（已截图）；自动化层的未知异常以 `Err` 向上传递
    pub async fn create(
        &mut self,
        name: &str,
        description: Option<&str>,
        file: &Path,
        ctx: &ItemCtx,
    ) -> Result<ProcessResult> {
        info!("{} 🚀 开始创建子表单: {}", ctx, name);
        info!("{} PDF 路径: {}", ctx, file.display());

        self.state = if self.positioned {
            FlowState::PositionedOnTarget
        } else {
            FlowState::Start
        };

        match self.run_steps(name, description, file, ctx).await {
            Ok(()) => {
                info!("{} ✅ 子表单创建成功", ctx);
                Ok(ProcessResult::Success)
            }
            Err(StepFailure { step, error }) => {
                error!("{} ❌ 步骤 [{}] 失败 (状态 {}): {}", ctx, step, self.state, error);
                self.executor.capture_diagnostic(&step).await;

                let unknown = matches!(error, AutomationError::Unknown(_));
                self.recover_after_failure(ctx, unknown).await;

                if unknown {
                    return Err(error.into());
                }
                Ok(ProcessResult::Failed {
                    reason: error.to_string(),
                })
            }
        }
    }

    async fn run_steps(
        &mut self,
        name: &str,
        description: Option<&str>,
        file: &Path,
        ctx: &ItemCtx,
    ) -> Result<(), StepFailure> {
        if self.positioned {
            info!("{} ✅ 已在子表单页面，跳过导航", ctx);
        } else {
            self.navigate_to_sub_forms(ctx).await?;
            self.positioned = true;
        }
        self.state = FlowState::PositionedOnTarget;

        info!("{} 🔍 打开新建对话框...", ctx);
        self.click(&self.selectors.new_button, self.candidate_timeout)
            .await
            .map_err(at(self.selectors.new_button.name()))?;
        self.state = FlowState::DialogOpen;

        info!("{} 🔍 选择 \"Upload a PDF\" 模式...", ctx);
        self.click(&self.selectors.upload_mode, self.candidate_timeout)
            .await
            .map_err(at(self.selectors.upload_mode.name()))?;
        self.state = FlowState::UploadModeSelected;

        info!("{} 📝 填写表单名称...", ctx);
        self.fill(&self.selectors.name_input, name)
            .await
            .map_err(at(self.selectors.name_input.name()))?;
        self.state = FlowState::NameSet;

        if let Some(description) = description {
            if let Err(e) = self.fill(&self.selectors.description_input, description).await {
                warn!("{} ⚠️ 描述未填写，继续: {}", ctx, e);
            }
        }

        info!("{} 📁 上传 PDF...", ctx);
        let upload = Action::Upload {
            file: file.to_path_buf(),
            chooser_timeout: self.upload_timeout,
        };
        self.executor
            .perform(&upload, &self.selectors.upload_trigger, self.candidate_timeout)
            .await
            .map_err(at(self.selectors.upload_trigger.name()))?;
        sleep(self.settle).await;
        self.state = FlowState::FileAttached;

        info!("{} 🔍 点击 \"Next\"...", ctx);
        self.click(&self.selectors.next_button, self.candidate_timeout)
            .await
            .map_err(at(self.selectors.next_button.name()))?;
        self.state = FlowState::Submitted;

        self.await_build(ctx)
            .await
            .map_err(at(self.selectors.building_indicator.name()))?;
        self.state = FlowState::Building;

        info!("{} 🔍 返回列表...", ctx);
        self.click(&self.selectors.back_button, self.candidate_timeout)
            .await
            .map_err(at(self.selectors.back_button.name()))?;
        self.state = FlowState::Closed;

        Ok(())
    }

    /// 失败后尽力关闭仍打开的对话框，让下一个条目从子表单列表开始
    ///
    /// 关闭不了（或浏览器已不可用）时清除"已就位"标记，下一个条目重新导航。
    async fn recover_after_failure(&mut self, ctx: &ItemCtx, unknown: bool) {
        let dialog_open = matches!(
            self.state,
            FlowState::DialogOpen
                | FlowState::UploadModeSelected
                | FlowState::NameSet
                | FlowState::FileAttached
                | FlowState::Submitted
        );
        if !dialog_open {
            // Building 之后失败的正是返回按钮
            if self.state == FlowState::Building {
                self.positioned = false;
            }
            return;
        }
        if unknown {
            self.positioned = false;
            return;
        }

        match self
            .executor
            .perform(&Action::Click, &self.selectors.back_button, self.candidate_timeout)
            .await
        {
            Ok(_) => {
                sleep(self.settle).await;
                self.state = FlowState::PositionedOnTarget;
                info!("{} ↩️ 已关闭对话框", ctx);
            }
            Err(e) => {
                warn!("{} ⚠️ 无法关闭对话框，下一个条目将重新导航: {}", ctx, e);
                self.positioned = false;
            }
        }
    }

    /// 侧边栏频道 → 顶栏频道名 → Sub Forms
    async fn navigate_to_sub_forms(&self, ctx: &ItemCtx) -> Result<(), StepFailure> {
        info!("{} 🧭 正在进入子表单页面...", ctx);

        for spec in [
            &self.selectors.sidebar_channel,
            &self.selectors.header_channel,
            &self.selectors.sub_forms,
        ] {
            self.click(spec, self.navigation_timeout)
                .await
                .map_err(at(spec.name()))?;
        }

        info!("{} ✅ 已进入子表单页面", ctx);
        Ok(())
    }

    /// 等待远端构建
    ///
    /// 提示在短时间内没有出现时视为已经完成；出现后必须在时限内消失。
    async fn await_build(&self, ctx: &ItemCtx) -> AutomationResult<()> {
        info!(
            "{} ⏳ 等待表单构建（最多 {} 秒）...",
            ctx,
            self.build_timeout.as_secs()
        );

        let indicator = &self.selectors.building_indicator;
        let appeared = match self
            .executor
            .perform(&Action::WaitAppear, indicator, self.build_appear_timeout)
            .await
        {
            Ok(performed) => performed,
            Err(AutomationError::LocatorExhausted { .. }) => {
                warn!("{} ⚠️ 未检测到构建提示，按已完成处理", ctx);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let candidate = &indicator.candidates()[appeared.index];
        if !self.executor.wait_gone(candidate, self.build_timeout).await? {
            return Err(AutomationError::BuildTimeout {
                secs: self.build_timeout.as_secs(),
            });
        }

        info!("{} ✅ 表单构建完成", ctx);
        sleep(self.settle).await;
        Ok(())
    }

    async fn click(&self, spec: &LocatorSpec, timeout: Duration) -> AutomationResult<()> {
        self.executor.perform(&Action::Click, spec, timeout).await?;
        sleep(self.settle).await;
        Ok(())
    }

    async fn fill(&self, spec: &LocatorSpec, text: &str) -> AutomationResult<()> {
        self.executor
            .perform(&Action::Fill(text.to_string()), spec, self.candidate_timeout)
            .await?;
        sleep(self.settle).await;
        Ok(())
    }

    /// 表格记录按名称到各文件夹查找 PDF
    fn resolve_file(&self, item: &WorkItem) -> Option<PathBuf> {
        match &item.payload {
            ItemPayload::PdfFile { path } => Some(path.clone()),
            ItemPayload::Record { name, .. } => {
                find_pdf_by_name(&self.pdf_base_dir, &self.folders, name).map(|(path, _)| path)
            }
        }
    }
}

#[async_trait]
impl<D: PageDriver + 'static> ItemProcessor for SubFormFlow<D> {
    async fn process(&mut self, item: &WorkItem, ctx: &ItemCtx) -> Result<ProcessResult> {
        let Some(file) = self.resolve_file(item) else {
            let reason = format!("未找到 PDF: {}", item.display_name());
            warn!("{} ⚠️ {}", ctx, reason);
            return Ok(ProcessResult::Failed { reason });
        };

        self.create(&item.display_name(), item.description(), &file, ctx)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::test_support::FakeDriver;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: Config,
        driver: Arc<FakeDriver>,
        selectors: SubFormSelectors,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config::for_tests(dir.path());
            let driver = Arc::new(FakeDriver::new());
            driver.show_all();
            Self {
                _dir: dir,
                config,
                driver,
                selectors: SubFormSelectors::default(),
            }
        }

        fn flow(&self) -> SubFormFlow<FakeDriver> {
            SubFormFlow::new(self.driver.clone(), &self.config)
        }

        fn first(spec: &LocatorSpec) -> String {
            spec.candidates()[0].description.clone()
        }
    }

    #[tokio::test]
    async fn test_happy_path_walks_every_state() {
        let fx = Fixture::new();
        let mut flow = fx.flow();
        let item = WorkItem::from_pdf("/pdfs/2/2.16-ACCU-Semi-Annual.pdf");

        let result = flow.process(&item, &ItemCtx::single()).await.unwrap();

        assert_eq!(result, ProcessResult::Success);
        assert_eq!(flow.state(), FlowState::Closed);
        assert!(flow.is_positioned());
        let s = &fx.selectors;
        assert_eq!(
            fx.driver.clicks(),
            vec![
                Fixture::first(&s.sidebar_channel),
                Fixture::first(&s.header_channel),
                Fixture::first(&s.sub_forms),
                Fixture::first(&s.new_button),
                Fixture::first(&s.upload_mode),
                Fixture::first(&s.next_button),
                Fixture::first(&s.back_button),
            ]
        );
        assert_eq!(
            fx.driver.fills(),
            vec![(Fixture::first(&s.name_input), "2.16-ACCU-Semi-Annual".to_string())]
        );
        assert_eq!(
            fx.driver.uploads(),
            vec![PathBuf::from("/pdfs/2/2.16-ACCU-Semi-Annual.pdf")]
        );
    }

    #[tokio::test]
    async fn test_second_item_skips_navigation() {
        let fx = Fixture::new();
        let mut flow = fx.flow();
        let ctx = ItemCtx::single();

        flow.process(&WorkItem::from_pdf("/pdfs/1/a.pdf"), &ctx).await.unwrap();
        flow.process(&WorkItem::from_pdf("/pdfs/1/b.pdf"), &ctx).await.unwrap();

        let sidebar = Fixture::first(&fx.selectors.sidebar_channel);
        let clicks = fx.driver.clicks();
        assert_eq!(clicks.iter().filter(|c| **c == sidebar).count(), 1);
        assert_eq!(clicks.len(), 7 + 4);
    }

    #[tokio::test]
    async fn test_upload_failure_is_recorded_with_screenshot() {
        let fx = Fixture::new();
        fx.driver.fail_upload_for("b.pdf");
        let mut flow = fx.flow();

        let result = flow
            .process(&WorkItem::from_pdf("/pdfs/1/b.pdf"), &ItemCtx::single())
            .await
            .unwrap();

        let ProcessResult::Failed { reason } = result else {
            panic!("上传失败应返回 Failed");
        };
        assert!(reason.contains("PDF 上传失败"));
        assert_eq!(
            fx.driver.screenshots(),
            vec![Path::new(&fx.config.screenshot_dir).join("debug-upload-trigger.png")]
        );
        // 失败后不再继续点击 Next，而是关闭对话框回到列表
        let clicks = fx.driver.clicks();
        assert!(!clicks.contains(&Fixture::first(&fx.selectors.next_button)));
        assert_eq!(clicks.last(), Some(&Fixture::first(&fx.selectors.back_button)));
        assert_eq!(flow.state(), FlowState::PositionedOnTarget);
        assert!(flow.is_positioned());
    }

    #[tokio::test]
    async fn test_item_after_mid_dialog_failure_starts_from_the_list() {
        let fx = Fixture::new();
        fx.driver.fail_upload_for("a.pdf");
        let mut flow = fx.flow();
        let ctx = ItemCtx::single();

        flow.process(&WorkItem::from_pdf("/pdfs/1/a.pdf"), &ctx).await.unwrap();
        let result = flow.process(&WorkItem::from_pdf("/pdfs/1/b.pdf"), &ctx).await.unwrap();

        assert_eq!(result, ProcessResult::Success);
        let sidebar = Fixture::first(&fx.selectors.sidebar_channel);
        let new_button = Fixture::first(&fx.selectors.new_button);
        let clicks = fx.driver.clicks();
        assert_eq!(clicks.iter().filter(|c| **c == sidebar).count(), 1);
        assert_eq!(clicks.iter().filter(|c| **c == new_button).count(), 2);
    }

    #[tokio::test]
    async fn test_dialog_that_cannot_be_closed_forces_renavigation() {
        let fx = Fixture::new();
        fx.driver.fail_upload_for("a.pdf");
        fx.driver.hide(&Fixture::first(&fx.selectors.back_button));
        let mut flow = fx.flow();

        let result = flow
            .process(&WorkItem::from_pdf("/pdfs/1/a.pdf"), &ItemCtx::single())
            .await
            .unwrap();

        assert!(matches!(result, ProcessResult::Failed { .. }));
        assert_eq!(flow.state(), FlowState::NameSet);
        assert!(!flow.is_positioned());
    }

    #[tokio::test]
    async fn test_unfillable_description_does_not_fail_the_item() {
        let fx = Fixture::new();
        for candidate in fx.selectors.description_input.candidates() {
            fx.driver.hide(&candidate.description);
        }
        let folder = Path::new(&fx.config.pdf_base_dir).join("3");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("3.2-Fan-Weekly.pdf"), b"%PDF").unwrap();
        let mut flow = fx.flow();

        let item = WorkItem::from_record("3.2-Fan-Weekly", Some("Belt tension".to_string()));
        let result = flow.process(&item, &ItemCtx::single()).await.unwrap();

        assert_eq!(result, ProcessResult::Success);
        assert_eq!(flow.state(), FlowState::Closed);
        assert!(fx.driver.screenshots().is_empty());
        assert_eq!(fx.driver.fills().len(), 1);
        assert_eq!(fx.driver.uploads(), vec![folder.join("3.2-Fan-Weekly.pdf")]);
    }

    #[tokio::test]
    async fn test_missing_build_indicator_is_tolerated() {
        let fx = Fixture::new();
        fx.driver.hide(&Fixture::first(&fx.selectors.building_indicator));
        let mut flow = fx.flow();

        let result = flow
            .process(&WorkItem::from_pdf("/pdfs/1/a.pdf"), &ItemCtx::single())
            .await
            .unwrap();

        assert_eq!(result, ProcessResult::Success);
        assert_eq!(flow.state(), FlowState::Closed);
    }

    #[tokio::test]
    async fn test_build_that_never_finishes_fails_the_item() {
        let fx = Fixture::new();
        fx.driver.stick(&Fixture::first(&fx.selectors.building_indicator));
        let mut flow = fx.flow();

        let result = flow
            .process(&WorkItem::from_pdf("/pdfs/1/a.pdf"), &ItemCtx::single())
            .await
            .unwrap();

        assert!(matches!(result, ProcessResult::Failed { ref reason } if reason.contains("构建超时")));
        assert_eq!(fx.driver.clicks().last(), Some(&Fixture::first(&fx.selectors.back_button)));
        assert_eq!(flow.state(), FlowState::PositionedOnTarget);
    }

    #[tokio::test]
    async fn test_unknown_automation_error_propagates() {
        let fx = Fixture::new();
        fx.driver.explode_on(&Fixture::first(&fx.selectors.new_button));
        let mut flow = fx.flow();

        let err = flow
            .process(&WorkItem::from_pdf("/pdfs/1/a.pdf"), &ItemCtx::single())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("has been closed"));
        assert_eq!(fx.driver.screenshots().len(), 1);
        assert!(!fx.driver.clicks().contains(&Fixture::first(&fx.selectors.back_button)));
    }

    #[tokio::test]
    async fn test_record_item_resolves_pdf_and_fills_description() {
        let fx = Fixture::new();
        let folder = Path::new(&fx.config.pdf_base_dir).join("5");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("5.1-Pump-Monthly.pdf"), b"%PDF").unwrap();
        let mut flow = fx.flow();

        let item = WorkItem::from_record("5.1-Pump-Monthly", Some("Check seals".to_string()));
        let result = flow.process(&item, &ItemCtx::single()).await.unwrap();

        assert_eq!(result, ProcessResult::Success);
        assert_eq!(fx.driver.uploads(), vec![folder.join("5.1-Pump-Monthly.pdf")]);
        assert_eq!(
            fx.driver.fills()[1],
            (Fixture::first(&fx.selectors.description_input), "Check seals".to_string())
        );

        let missing = WorkItem::from_record("9.9-Nothing", None);
        let result = flow.process(&missing, &ItemCtx::single()).await.unwrap();
        assert!(matches!(result, ProcessResult::Failed { ref reason } if reason.contains("9.9-Nothing")));
    }
}
