//! 命令分发器
//!
//! 单线程读键循环：按键 → 命令 → 批处理 / 单条 / 状态 / 维护操作。
//! 具有破坏性的命令（整个文件夹、续传、清空检查点）先等一次空行确认。

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::{Console, PageDriver};
use crate::models::{find_pdf_by_name, load_csv_records, load_pdf_folder, WorkItem};
use crate::orchestrator::batch_processor::{BatchProcessor, BatchSummary, RunMode};
use crate::repl::command::{Command, CommandParser, Library, Parsed, Prefix};
use crate::repl::menu::show_menu;
use crate::services::{CheckpointStore, SessionManager};
use crate::workflow::{ItemCtx, ItemProcessor, ProcessResult, SubFormFlow};

/// 表格批处理使用的批次标识
pub const CSV_BATCH_ID: &str = "csv";

/// 命令执行后是否继续循环
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// 命令分发器
pub struct Dispatcher<D, C> {
    config: Config,
    session: SessionManager<D>,
    flow: SubFormFlow<D>,
    store: CheckpointStore,
    batch: BatchProcessor,
    parser: CommandParser,
    console: C,
}

impl<D: PageDriver + 'static, C: Console> Dispatcher<D, C> {
    /// 创建命令分发器
    pub fn new(config: Config, driver: Arc<D>, store: CheckpointStore, console: C) -> Self {
        Self {
            session: SessionManager::new(driver.clone(), &config),
            flow: SubFormFlow::new(driver, &config),
            batch: BatchProcessor::new(config.pacing()),
            parser: CommandParser::new(config.folders.clone()),
            store,
            console,
            config,
        }
    }

    pub fn session(&self) -> &SessionManager<D> {
        &self.session
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// 准备会话并进入读键循环，直到退出命令
    pub async fn run(&mut self) -> Result<()> {
        self.session.ensure_ready(&mut self.console).await?;
        show_menu(&self.config).await;

        loop {
            let key = self.console.read_key().await?;

            let command = match self.parser.feed(key) {
                Parsed::Command(command) => command,
                Parsed::AwaitingFolder(prefix) => {
                    let label = match prefix {
                        Prefix::FullBatch => "整个文件夹",
                        Prefix::Resume => "续传",
                    };
                    info!("\n📁 {}：请输入文件夹编号 ({})", label, self.config.folders.join("/"));
                    continue;
                }
                Parsed::Ignored => continue,
            };

            match self.execute(command).await {
                Ok(Control::Quit) => return Ok(()),
                Ok(Control::Continue) => {}
                Err(e) => error!("❌ 命令执行失败: {:#}", e),
            }
            show_menu(&self.config).await;
        }
    }

    /// 执行一条命令
    pub async fn execute(&mut self, command: Command) -> Result<Control> {
        match command {
            Command::TestItem => {
                let path = self.config.test_pdf_path();
                info!("\n📄 测试 PDF: {}", path.display());
                self.upload_single(&path).await?;
            }
            Command::ByName(library) => self.upload_by_name(library).await?,
            Command::QuickBatch(folder) => {
                let items = load_pdf_folder(&self.config.pdf_base_dir, &folder).await?;
                self.run_batch(&folder, &items, RunMode::Fresh, self.config.quick_batch_limit)
                    .await?;
            }
            Command::FullBatch(folder) => self.full_batch(&folder).await?,
            Command::Resume(folder) => self.resume(&folder).await?,
            Command::CsvBatch => {
                let items = load_csv_records(Path::new(&self.config.csv_file))?;
                self.run_batch(CSV_BATCH_ID, &items, RunMode::Resume, None)
                    .await?;
            }
            Command::Status => self.print_status(),
            Command::ClearCheckpoint => {
                warn!("\n⚠️ 将清空所有批处理进度 ({})", self.store.path().display());
                if self.confirm().await? {
                    self.store.clear().await?;
                } else {
                    info!("已取消");
                }
            }
            Command::Reload => self.session.reload().await?,
            Command::Quit => {
                info!("\n👋 退出...");
                return Ok(Control::Quit);
            }
        }
        Ok(Control::Continue)
    }

    async fn full_batch(&mut self, folder: &str) -> Result<()> {
        let items = load_pdf_folder(&self.config.pdf_base_dir, folder).await?;
        warn!("\n⚠️ 将上传文件夹 {} 中全部 {} 个 PDF！", folder, items.len());

        if !self.confirm().await? {
            info!("已取消");
            return Ok(());
        }
        self.run_batch(folder, &items, RunMode::Fresh, None).await?;
        Ok(())
    }

    async fn resume(&mut self, folder: &str) -> Result<()> {
        let items = load_pdf_folder(&self.config.pdf_base_dir, folder).await?;
        let done = self
            .store
            .record(folder)
            .map(|record| items.iter().filter(|i| record.is_completed(&i.key)).count())
            .unwrap_or(0);
        warn!(
            "\n⚠️ 续传文件夹 {}：已完成 {} 个，剩余 {} 个",
            folder,
            done,
            items.len() - done
        );

        if !self.confirm().await? {
            info!("已取消");
            return Ok(());
        }
        self.run_batch(folder, &items, RunMode::Resume, None).await?;
        Ok(())
    }

    async fn run_batch(
        &mut self,
        batch_id: &str,
        items: &[WorkItem],
        mode: RunMode,
        limit: Option<usize>,
    ) -> Result<BatchSummary> {
        self.session.ensure_ready(&mut self.console).await?;
        self.batch
            .run(&mut self.flow, &mut self.store, batch_id, items, mode, limit)
            .await
    }

    async fn upload_by_name(&mut self, library: Library) -> Result<()> {
        let (root, label) = match library {
            Library::Ai => (self.config.pdf_base_dir.clone(), "AI 优化版"),
            Library::Standard => (self.config.pdf_standard_dir.clone(), "标准版"),
        };

        let name = self
            .console
            .read_line(&format!(
                "\n📝 请输入子表单名称（{}，例如 4.6-EX. PANEL 432-Quarterly），直接回车取消: ",
                label
            ))
            .await?;
        let name = name.trim();
        if name.is_empty() {
            info!("已取消");
            return Ok(());
        }

        match find_pdf_by_name(&root, &self.config.folders, name) {
            Some((path, folder)) => {
                info!("✅ 在文件夹 {} 中找到: {}", folder, path.display());
                self.upload_single(&path).await
            }
            None => {
                warn!("❌ 未找到 PDF: {}（已搜索 {}）", name, root);
                Ok(())
            }
        }
    }

    /// 单条上传，不写检查点
    async fn upload_single(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            warn!("❌ 文件不存在: {}", path.display());
            return Ok(());
        }

        self.session.ensure_ready(&mut self.console).await?;
        let item = WorkItem::from_pdf(path);
        match self.flow.process(&item, &ItemCtx::single()).await {
            Ok(ProcessResult::Success) => info!("✅ 子表单上传成功"),
            Ok(ProcessResult::Failed { reason }) => error!("❌ 上传失败: {}", reason),
            Err(e) => error!("❌ 上传异常: {}", e),
        }
        Ok(())
    }

    async fn confirm(&mut self) -> Result<bool> {
        let answer = self
            .console
            .read_line("按回车确认，输入任意内容取消: ")
            .await
            .context("读取确认失败")?;
        Ok(answer.trim().is_empty())
    }

    fn print_status(&self) {
        info!("\n{}", "=".repeat(60));
        info!("📊 批处理进度 ({})", self.store.path().display());
        info!("{}", "=".repeat(60));

        if self.store.all().is_empty() {
            info!("暂无进度记录");
        }
        for (key, record) in self.store.all() {
            info!(
                "{}: 完成 {}/{} ({:.1}%)，失败 {}",
                key,
                record.completed.len(),
                record.total_files,
                record.progress_percent(),
                record.failed.len()
            );
            if let (Some(last), Some(at)) = (&record.last_processed_key, &record.last_processed_time) {
                info!("   最近处理: {} @ {}", last, at);
            }
        }
        info!("{}", "=".repeat(60));
    }
}
