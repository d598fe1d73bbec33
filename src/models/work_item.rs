use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PDF_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.pdf$").expect("扩展名正则无效"));

/// 条目的输入数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPayload {
    /// 直接上传的 PDF 文件
    PdfFile { path: PathBuf },
    /// 表格中的一行记录，PDF 需按名称到文件夹中查找
    Record {
        name: String,
        description: Option<String>,
    },
}

/// 批处理的一个工作单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 检查点中使用的键（文件名或记录名）
    pub key: String,
    pub payload: ItemPayload,
}

impl WorkItem {
    /// 由 PDF 路径创建，键为文件名
    pub fn from_pdf(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            key,
            payload: ItemPayload::PdfFile { path },
        }
    }

    /// 由表格记录创建，键为记录名
    pub fn from_record(name: impl Into<String>, description: Option<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            payload: ItemPayload::Record { name, description },
        }
    }

    /// 表单中显示的名称
    pub fn display_name(&self) -> String {
        match &self.payload {
            ItemPayload::PdfFile { path } => derive_display_name(path),
            ItemPayload::Record { name, .. } => name.clone(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match &self.payload {
            ItemPayload::Record {
                description: Some(d),
                ..
            } if !d.trim().is_empty() => Some(d.as_str()),
            _ => None,
        }
    }
}

/// 由文件路径推导表单名称
///
/// 只去掉结尾的 `.pdf`（不区分大小写），名称内部的点和连字符原样保留。
pub fn derive_display_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    PDF_EXTENSION.replace(&file_name, "").into_owned()
}
