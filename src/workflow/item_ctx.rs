//! 条目处理上下文
//!
//! 封装"我正在处理哪个批次的第几条"这一信息

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 批次标识（文件夹编号、`csv` 或 `single`）
    pub batch_id: String,

    /// 在本次待处理列表中的位置（从1开始）
    pub index: usize,

    /// 本次待处理总数
    pub total: usize,
}

impl ItemCtx {
    /// 创建新的条目上下文
    pub fn new(batch_id: impl Into<String>, index: usize, total: usize) -> Self {
        Self {
            batch_id: batch_id.into(),
            index,
            total,
        }
    }

    /// 单条命令使用的上下文
    pub fn single() -> Self {
        Self::new("single", 1, 1)
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 {} 条目 {}/{}]", self.batch_id, self.index, self.total)
    }
}
