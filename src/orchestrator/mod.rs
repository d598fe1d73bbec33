//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批处理引擎
//! - 续传过滤与数量截断
//! - 顺序驱动每个条目通过流程
//! - 唯一的失败兜底点：任何失败都记录到检查点，批次继续
//! - 输出批次摘要
//!
//! ### `app` - 应用生命周期
//! - 启动浏览器、载入检查点
//! - 运行命令循环，退出时关闭浏览器
//!
//! ## 层次关系
//!
//! ```text
//! repl::Dispatcher (按键 → 命令)
//!     ↓
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓
//! workflow::SubFormFlow (处理单个 WorkItem)
//!     ↓
//! infrastructure (ActionExecutor → PageDriver)
//! ```

pub mod app;
pub mod batch_processor;

pub use app::App;
pub use batch_processor::{select_pending, BatchProcessor, BatchSummary, RunMode};
