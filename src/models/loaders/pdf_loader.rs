use crate::models::work_item::WorkItem;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 `<根目录>/<文件夹编号>` 中加载所有 PDF
///
/// 顺序即文件系统的原始列举顺序。
pub async fn load_pdf_folder(base_dir: &str, folder_id: &str) -> Result<Vec<WorkItem>> {
    let folder = Path::new(base_dir).join(folder_id);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder.display());
    }

    let mut items = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_pdf(&path) {
            items.push(WorkItem::from_pdf(path));
        }
    }

    tracing::debug!("文件夹 {} 中找到 {} 个 PDF", folder_id, items.len());
    Ok(items)
}

/// 统计文件夹中的 PDF 数量，文件夹不存在时返回 None
pub async fn count_pdfs(base_dir: &str, folder_id: &str) -> Option<usize> {
    load_pdf_folder(base_dir, folder_id).await.ok().map(|items| items.len())
}

/// 按表单名称在各文件夹中查找 PDF
///
/// 按 `folders` 的顺序查找 `<根目录>/<文件夹>/<名称>.pdf`，返回第一个存在的路径和所在文件夹。
pub fn find_pdf_by_name(base_dir: &str, folders: &[String], name: &str) -> Option<(PathBuf, String)> {
    folders.iter().find_map(|folder| {
        let path = Path::new(base_dir).join(folder).join(format!("{}.pdf", name));
        path.is_file().then(|| (path, folder.clone()))
    })
}

fn is_pdf(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
