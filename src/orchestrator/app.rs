//! 应用生命周期 - 编排层
//!
//! 唯一持有浏览器会话的模块：启动浏览器、载入检查点、交给命令分发器，
//! 退出或收到中断时关闭浏览器。

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{CdpDriver, TerminalConsole};
use crate::repl::Dispatcher;
use crate::services::CheckpointStore;
use crate::utils::logging::log_startup;

/// 应用主结构
pub struct App {
    dispatcher: Dispatcher<CdpDriver, TerminalConsole>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config.target_url, &config.profile_dir);

        let store = CheckpointStore::open(&config.checkpoint_file).await?;
        info!(
            "📒 检查点: {}（{} 个批次）",
            config.checkpoint_file,
            store.all().len()
        );

        let driver = Arc::new(browser::launch_driver(&config).await?);
        let dispatcher = Dispatcher::new(config, driver, store, TerminalConsole::new());

        Ok(Self { dispatcher })
    }

    /// 运行命令循环，直到退出命令
    pub async fn run(&mut self) -> Result<()> {
        self.dispatcher.run().await
    }

    /// 关闭浏览器（尽力而为）
    pub async fn shutdown(&self) {
        self.dispatcher.session().close().await;
        info!("✓ 程序结束");
    }
}
