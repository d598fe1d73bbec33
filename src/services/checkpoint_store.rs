//! 检查点存储 - 业务能力层
//!
//! 整个文件是一个 JSON 对象，顶层键为 `folder_<id>`。
//! 每次变更后立即整体重写（先写临时文件再重命名）。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::models::checkpoint::{folder_key, CheckpointMap, CheckpointRecord, ItemOutcome};

/// 检查点存储
///
/// 只由批处理循环顺序修改，不需要额外同步。
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    records: CheckpointMap,
}

impl CheckpointStore {
    /// 打开检查点文件并载入内容
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = Self::load(&path).await?;
        debug!("检查点已载入: {} 个批次", records.len());
        Ok(Self { path, records })
    }

    /// 读取检查点文件
    ///
    /// 文件不存在时返回空映射；内容损坏时返回错误，避免覆盖已有进度。
    pub async fn load(path: &Path) -> Result<CheckpointMap> {
        if !path.exists() {
            return Ok(CheckpointMap::new());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取检查点文件: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(CheckpointMap::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("检查点文件格式错误: {}", path.display()))
    }

    /// 整体重写检查点文件
    pub async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("无法写入临时检查点: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("无法替换检查点文件: {}", self.path.display()))?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> &CheckpointMap {
        &self.records
    }

    /// 某个批次的进度
    pub fn record(&self, folder_id: &str) -> Option<&CheckpointRecord> {
        self.records.get(&folder_key(folder_id))
    }

    /// 批次开始：刷新总数并剔除已不存在的条目，然后保存
    pub async fn begin_run(&mut self, folder_id: &str, keys: &[String]) -> Result<()> {
        self.records
            .entry(folder_key(folder_id))
            .or_default()
            .begin_run(keys);
        self.save().await
    }

    /// 记录单个条目的结果并立即保存
    pub async fn record_outcome(
        &mut self,
        folder_id: &str,
        key: &str,
        outcome: &ItemOutcome,
    ) -> Result<()> {
        let at = chrono::Local::now().to_rfc3339();
        self.records
            .entry(folder_key(folder_id))
            .or_default()
            .record(key, outcome, at);
        self.save().await
    }

    /// 清空所有进度，文件重置为 `{}`
    pub async fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.save().await?;
        info!("🗑️ 检查点已清空: {}", self.path.display());
        Ok(())
    }
}
