use tracing::info;

use crate::config::Config;
use crate::models::count_pdfs;

/// 输出命令菜单，附带各文件夹的 PDF 数量
pub async fn show_menu(config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📋 命令菜单");
    info!("{}", "=".repeat(60));
    info!("  c       上传测试 PDF ({})", config.test_pdf_name);
    info!("  p       按名称上传（AI 优化版）");
    info!("  a       按名称上传（标准版）");

    let quick = match config.quick_batch_limit {
        Some(limit) => format!("前 {} 个", limit),
        None => "全部".to_string(),
    };
    for folder in &config.folders {
        let count = match count_pdfs(&config.pdf_base_dir, folder).await {
            Some(n) => format!("{} 个 PDF", n),
            None => "文件夹不存在".to_string(),
        };
        info!("  {}       批处理文件夹 {}（{}，{}）", folder, folder, quick, count);
    }

    info!("  F + 编号 整个文件夹（需确认）");
    info!("  R + 编号 续传文件夹（需确认）");
    info!("  b       表格批处理 ({})", config.csv_file);
    info!("  s       查看进度");
    info!("  x       清空检查点（需确认）");
    info!("  r       刷新页面");
    info!("  q       退出");
    info!("{}", "=".repeat(60));
}
