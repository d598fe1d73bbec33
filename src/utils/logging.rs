//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use anyhow::{Context, Result};
use std::fs;
use tracing::info;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n子表单上传日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `target_url`: 目标应用地址
/// - `profile_dir`: 浏览器配置目录
pub fn log_startup(target_url: &str, profile_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 持久会话模式");
    info!("🌐 目标应用: {}", target_url);
    info!("📂 浏览器配置目录: {}", profile_dir);
    info!("{}", "=".repeat(60));
}

/// 记录批处理开始信息
///
/// # 参数
/// - `folder_id`: 文件夹编号
/// - `discovered`: 发现的条目总数
/// - `to_process`: 本次待处理条目数
pub fn log_batch_start(folder_id: &str, discovered: usize, to_process: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📁 开始批处理: 文件夹 {}", folder_id);
    info!("📄 共发现 {} 个条目，本次处理 {} 个", discovered, to_process);
    info!("{}", "=".repeat(60));
}

/// 记录单个条目开始
pub fn log_item_start(index: usize, total: usize, name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("[{}/{}] 正在处理: {}", index, total, name);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
