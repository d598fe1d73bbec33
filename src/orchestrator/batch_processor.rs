//! 批处理引擎 - 编排层
//!
//! ## 职责
//!
//! 1. **过滤**：续传模式下跳过检查点中已完成的条目，失败的条目重新处理
//! 2. **截断**：`limit` 只截断待处理列表，不影响发现的总数
//! 3. **顺序处理**：一次一个条目，严格按输入顺序
//! 4. **统一兜底**：流程返回的失败和抛出的异常都在这里转换为失败记录
//! 5. **即时落盘**：每个条目结束后立即写检查点，然后固定间隔再处理下一个

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::models::{CheckpointRecord, ItemOutcome, WorkItem};
use crate::services::CheckpointStore;
use crate::utils::logging::{log_batch_start, log_item_start};
use crate::utils::truncate_text;
use crate::workflow::{ItemCtx, ItemProcessor, ProcessResult};

/// 摘要中最多列出的失败条目数
const MAX_LISTED_FAILURES: usize = 10;

/// 批处理模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 处理全部条目
    Fresh,
    /// 跳过已完成条目，重试失败条目
    Resume,
}

/// 批处理结果摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub batch_id: String,
    /// 检查点中累计完成数
    pub completed: usize,
    /// 检查点中累计失败数
    pub failed: usize,
    /// 发现的条目总数
    pub total: usize,
    /// 本次实际处理数
    pub processed: usize,
    pub run_completed: usize,
    pub run_failed: usize,
    /// 当前失败的条目及其最近一次错误
    pub failures: Vec<(String, String)>,
}

impl BatchSummary {
    fn from_record(batch_id: &str, record: Option<&CheckpointRecord>) -> Self {
        let Some(record) = record else {
            return Self {
                batch_id: batch_id.to_string(),
                ..Self::default()
            };
        };

        Self {
            batch_id: batch_id.to_string(),
            completed: record.completed.len(),
            failed: record.failed.len(),
            total: record.total_files,
            failures: record
                .failed
                .iter()
                .map(|key| {
                    let reason = record.errors.get(key).cloned().unwrap_or_default();
                    (key.clone(), reason)
                })
                .collect(),
            ..Self::default()
        }
    }

    /// 完成百分比（0–100）
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }

    /// 形如 `66.7%`
    pub fn progress_label(&self) -> String {
        format!("{:.1}%", self.progress_percent())
    }
}

/// 选出本次要处理的条目
///
/// 续传模式排除已完成的键（保持原顺序），然后按 `limit` 截断。
pub fn select_pending<'a>(
    items: &'a [WorkItem],
    record: Option<&CheckpointRecord>,
    mode: RunMode,
    limit: Option<usize>,
) -> Vec<&'a WorkItem> {
    let pending = items.iter().filter(|item| match (mode, record) {
        (RunMode::Resume, Some(record)) => !record.is_completed(&item.key),
        _ => true,
    });

    match limit {
        Some(limit) => pending.take(limit).collect(),
        None => pending.collect(),
    }
}

/// 批处理引擎
pub struct BatchProcessor {
    pacing: Duration,
}

impl BatchProcessor {
    /// 创建批处理引擎
    ///
    /// # 参数
    /// - `pacing`: 两个条目之间的固定间隔
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// 运行一个批次
    ///
    /// # 参数
    /// - `processor`: 单条目处理能力
    /// - `store`: 检查点存储
    /// - `batch_id`: 批次标识（检查点键为 `folder_<batch_id>`）
    /// - `items`: 发现的全部条目
    /// - `mode`: 全新 / 续传
    /// - `limit`: 待处理条目上限
    ///
    /// # 返回
    /// 只有检查点读写失败才返回错误；条目失败不会中断批次
    pub async fn run<P: ItemProcessor + ?Sized>(
        &self,
        processor: &mut P,
        store: &mut CheckpointStore,
        batch_id: &str,
        items: &[WorkItem],
        mode: RunMode,
        limit: Option<usize>,
    ) -> Result<BatchSummary> {
        let keys: Vec<String> = items.iter().map(|item| item.key.clone()).collect();
        store.begin_run(batch_id, &keys).await?;

        let pending = select_pending(items, store.record(batch_id), mode, limit);
        log_batch_start(batch_id, items.len(), pending.len());

        if mode == RunMode::Resume && items.len() > pending.len() {
            info!("⏭️ 跳过 {} 个已完成条目", items.len() - pending.len());
        }

        let total = pending.len();
        let mut run_completed = 0;
        let mut run_failed = 0;

        for (index, item) in pending.into_iter().enumerate() {
            let ctx = ItemCtx::new(batch_id, index + 1, total);
            log_item_start(index + 1, total, &item.display_name());

            let outcome = match processor.process(item, &ctx).await {
                Ok(ProcessResult::Success) => ItemOutcome::Completed,
                Ok(ProcessResult::Failed { reason }) => ItemOutcome::Failed(reason),
                Err(e) => {
                    error!("{} ❌ 处理异常: {}", ctx, e);
                    ItemOutcome::Failed(e.to_string())
                }
            };

            match &outcome {
                ItemOutcome::Completed => {
                    run_completed += 1;
                    info!("{} ✅ 完成", ctx);
                }
                ItemOutcome::Failed(reason) => {
                    run_failed += 1;
                    warn!("{} ❌ 失败: {}", ctx, reason);
                }
            }

            store.record_outcome(batch_id, &item.key, &outcome).await?;

            if index + 1 < total {
                sleep(self.pacing).await;
            }
        }

        let mut summary = BatchSummary::from_record(batch_id, store.record(batch_id));
        summary.processed = total;
        summary.run_completed = run_completed;
        summary.run_failed = run_failed;

        print_summary(&summary);
        Ok(summary)
    }
}

/// 输出批次摘要
pub fn print_summary(summary: &BatchSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批次 {} 处理完成", summary.batch_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "本次处理: {} 个（成功 {}，失败 {}）",
        summary.processed, summary.run_completed, summary.run_failed
    );
    info!(
        "✅ 累计完成: {}/{} ({})",
        summary.completed,
        summary.total,
        summary.progress_label()
    );
    info!("❌ 累计失败: {}", summary.failed);

    if !summary.failures.is_empty() {
        info!("失败条目:");
        for (key, reason) in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            info!("   - {}: {}", key, truncate_text(reason, 100));
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            info!("   ... 另有 {} 个", summary.failures.len() - MAX_LISTED_FAILURES);
        }
    }
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn items(names: &[&str]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|n| WorkItem::from_pdf(format!("/pdfs/1/{}", n)))
            .collect()
    }

    /// 按键名返回预设结果的处理器
    struct Scripted {
        seen: Vec<String>,
        fail: Vec<&'static str>,
        throw: Vec<&'static str>,
    }

    #[async_trait]
    impl ItemProcessor for Scripted {
        async fn process(&mut self, item: &WorkItem, _ctx: &ItemCtx) -> Result<ProcessResult> {
            self.seen.push(item.key.clone());
            if self.throw.iter().any(|k| *k == item.key) {
                anyhow::bail!("Target closed");
            }
            if self.fail.iter().any(|k| *k == item.key) {
                return Ok(ProcessResult::Failed {
                    reason: "步骤 [new-button] 未找到元素".to_string(),
                });
            }
            Ok(ProcessResult::Success)
        }
    }

    #[test]
    fn test_select_pending_resume_then_limit() {
        let all = items(&["a.pdf", "b.pdf", "c.pdf", "d.pdf"]);
        let mut record = CheckpointRecord::default();
        record.record("b.pdf", &ItemOutcome::Completed, String::new());
        record.record("c.pdf", &ItemOutcome::Failed("x".to_string()), String::new());

        fn keys(v: Vec<&WorkItem>) -> Vec<String> {
            v.into_iter().map(|i| i.key.clone()).collect()
        }

        assert_eq!(
            keys(select_pending(&all, Some(&record), RunMode::Resume, None)),
            vec!["a.pdf", "c.pdf", "d.pdf"]
        );
        assert_eq!(
            keys(select_pending(&all, Some(&record), RunMode::Resume, Some(2))),
            vec!["a.pdf", "c.pdf"]
        );
        assert_eq!(
            keys(select_pending(&all, Some(&record), RunMode::Fresh, Some(2))),
            vec!["a.pdf", "b.pdf"]
        );
    }

    #[tokio::test]
    async fn test_thrown_error_becomes_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CheckpointStore::open(dir.path().join("p.json")).await.unwrap();
        let mut processor = Scripted {
            seen: Vec::new(),
            fail: vec!["b.pdf"],
            throw: vec!["c.pdf"],
        };

        let summary = BatchProcessor::new(Duration::ZERO)
            .run(
                &mut processor,
                &mut store,
                "1",
                &items(&["a.pdf", "b.pdf", "c.pdf", "d.pdf"]),
                RunMode::Fresh,
                None,
            )
            .await
            .unwrap();

        assert_eq!(processor.seen.len(), 4);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.run_failed, 2);
        assert_eq!(summary.progress_label(), "50.0%");

        let record = store.record("1").unwrap();
        assert_eq!(record.errors["c.pdf"], "Target closed");
        assert_eq!(record.last_processed_key.as_deref(), Some("d.pdf"));
    }

    #[tokio::test]
    async fn test_limit_does_not_change_total() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CheckpointStore::open(dir.path().join("p.json")).await.unwrap();
        let mut processor = Scripted {
            seen: Vec::new(),
            fail: vec![],
            throw: vec![],
        };

        let summary = BatchProcessor::new(Duration::ZERO)
            .run(
                &mut processor,
                &mut store,
                "2",
                &items(&["a.pdf", "b.pdf", "c.pdf", "d.pdf", "e.pdf"]),
                RunMode::Fresh,
                Some(2),
            )
            .await
            .unwrap();

        assert_eq!(processor.seen, vec!["a.pdf", "b.pdf"]);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.progress_label(), "40.0%");
    }
}
