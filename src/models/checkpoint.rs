use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// 检查点文件内容：`folder_<id>` → 该文件夹的进度
pub type CheckpointMap = BTreeMap<String, CheckpointRecord>;

/// 检查点文件中的顶层键
pub fn folder_key(folder_id: &str) -> String {
    format!("folder_{}", folder_id)
}

/// 单个条目的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed,
    Failed(String),
}

/// 单个文件夹（批次）的进度记录
///
/// 不变式：`completed` 与 `failed` 不相交；`errors` 的键恰好是 `failed`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub failed: BTreeSet<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_time: Option<String>,
    #[serde(default)]
    pub total_files: usize,
}

impl CheckpointRecord {
    /// 记录一个条目的结果
    ///
    /// 成功会把键从 `failed` 移到 `completed` 并删除旧错误；
    /// 失败则反向移动并覆盖错误信息。
    pub fn record(&mut self, key: &str, outcome: &ItemOutcome, at: String) {
        match outcome {
            ItemOutcome::Completed => {
                self.failed.remove(key);
                self.errors.remove(key);
                self.completed.insert(key.to_string());
            }
            ItemOutcome::Failed(reason) => {
                self.completed.remove(key);
                self.failed.insert(key.to_string());
                self.errors.insert(key.to_string(), reason.clone());
            }
        }
        self.last_processed_key = Some(key.to_string());
        self.last_processed_time = Some(at);
    }

    /// 批处理开始时刷新总数，并剔除已不在输入集合中的键
    pub fn begin_run(&mut self, keys: &[String]) {
        let present: HashSet<&str> = keys.iter().map(String::as_str).collect();
        self.completed.retain(|k| present.contains(k.as_str()));
        self.failed.retain(|k| present.contains(k.as_str()));
        self.errors.retain(|k, _| present.contains(k.as_str()));
        self.total_files = present.len();
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    /// 完成百分比（0–100）
    pub fn progress_percent(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.completed.len() as f64 * 100.0 / self.total_files as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> String {
        "2025-11-03T10:00:00+00:00".to_string()
    }

    #[test]
    fn test_retry_moves_key_from_failed_to_completed() {
        let mut record = CheckpointRecord::default();
        record.record("a.pdf", &ItemOutcome::Failed("上传失败".to_string()), ts());
        assert!(record.failed.contains("a.pdf"));
        assert_eq!(record.errors.get("a.pdf").map(String::as_str), Some("上传失败"));

        record.record("a.pdf", &ItemOutcome::Completed, ts());
        assert!(record.completed.contains("a.pdf"));
        assert!(record.failed.is_empty());
        assert!(record.errors.is_empty());
        assert_eq!(record.last_processed_key.as_deref(), Some("a.pdf"));
    }

    #[test]
    fn test_failure_after_success_keeps_sets_disjoint() {
        let mut record = CheckpointRecord::default();
        record.record("a.pdf", &ItemOutcome::Completed, ts());
        record.record("a.pdf", &ItemOutcome::Failed("构建超时".to_string()), ts());
        assert!(record.completed.is_empty());
        assert!(record.failed.contains("a.pdf"));
    }

    #[test]
    fn test_begin_run_prunes_vanished_keys() {
        let mut record = CheckpointRecord::default();
        record.record("a.pdf", &ItemOutcome::Completed, ts());
        record.record("gone.pdf", &ItemOutcome::Failed("x".to_string()), ts());

        record.begin_run(&["a.pdf".to_string(), "b.pdf".to_string()]);

        assert_eq!(record.total_files, 2);
        assert!(record.completed.contains("a.pdf"));
        assert!(record.failed.is_empty());
        assert!(record.errors.is_empty());
        assert!((record.progress_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let mut record = CheckpointRecord::default();
        record.record("a.pdf", &ItemOutcome::Completed, ts());
        record.total_files = 3;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totalFiles"], 3);
        assert_eq!(json["lastProcessedKey"], "a.pdf");
        assert_eq!(json["completed"][0], "a.pdf");
        assert_eq!(folder_key("3"), "folder_3");
    }
}
