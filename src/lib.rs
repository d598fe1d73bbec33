//! # Coast Subform Upload
//!
//! 通过浏览器界面批量创建子表单（上传 PDF 模板）的自动化程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构，数据只向下流动：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、终端），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `PageDriver` / `CdpDriver` - 等待、点击、输入、拦截文件选择器、截图
//! - `ActionExecutor` - 按候选链逐个尝试定位并执行动作
//!
//! ### ② 业务能力层（Services）
//! - `SessionManager` - 打开入口页面、识别登录页、等待人工登录
//! - `CheckpointStore` - 每个条目结束后立即落盘的批处理进度
//!
//! ### ③ 流程层（Workflow）
//! - `SubFormFlow` - "创建一个子表单"的完整状态机
//! - `ItemCtx` - 上下文封装（批次 + 条目序号）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批处理引擎，唯一的失败兜底点
//! - `orchestrator/app` - 应用生命周期
//!
//! ### ⑤ 命令层（REPL）
//! - `repl/` - 单键命令、两键前缀命令与确认
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod repl;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::launch_driver;
pub use config::Config;
pub use error::{AutomationError, AutomationResult};
pub use infrastructure::{ActionExecutor, JsExecutor, LocatorSpec, PageDriver, Predicate};
pub use models::{CheckpointRecord, ItemOutcome, WorkItem};
pub use orchestrator::{App, BatchProcessor, BatchSummary, RunMode};
pub use services::{CheckpointStore, SessionManager};
pub use workflow::{ItemCtx, ItemProcessor, ProcessResult, SubFormFlow};
