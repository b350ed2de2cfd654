//! Immediate trigger - 一斉 sweep
//!
//! カタログの全タスクへ今すぐ 1 回ずつ attempt を走らせ、結果を集計して
//! 返す。プロセス起動直後のコールドスタートや手動の蹴り直しに使う。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatch::Dispatcher;
use crate::domain::{DispatchOutcome, TaskSpec};
use crate::ports::StoreError;

/// Tally of one sweep across a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub dispatched: usize,
    pub items_pushed: usize,
    pub too_early: usize,
    pub locked: usize,
    pub empty: usize,
    pub disabled: usize,
    pub failed: usize,
}

impl SweepSummary {
    fn record(&mut self, result: &Result<DispatchOutcome, StoreError>) {
        match result {
            Ok(DispatchOutcome::Dispatched { pushed }) => {
                self.dispatched += 1;
                self.items_pushed += pushed;
            }
            Ok(DispatchOutcome::SkippedTooEarly) => self.too_early += 1,
            Ok(DispatchOutcome::SkippedLocked) => self.locked += 1,
            Ok(DispatchOutcome::SkippedEmpty) => self.empty += 1,
            Ok(DispatchOutcome::SkippedDisabled) => self.disabled += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Total attempts accounted for.
    pub fn attempted(&self) -> usize {
        self.dispatched + self.too_early + self.locked + self.empty + self.disabled + self.failed
    }
}

/// Run one attempt for every task, all at the same time.
///
/// タスク間の順序は保証しない。相互排他は attempt 側のロックが持つので、
/// 同名タスクが混ざっていても二重配信にはならない。
pub async fn sweep_all(dispatcher: Arc<Dispatcher>, tasks: &[TaskSpec]) -> SweepSummary {
    let mut joins = Vec::with_capacity(tasks.len());
    for task in tasks.iter().cloned() {
        let dispatcher = Arc::clone(&dispatcher);
        joins.push(tokio::spawn(async move {
            let result = dispatcher.attempt(&task).await;
            (task, result)
        }));
    }

    let mut summary = SweepSummary::default();
    for join in joins {
        match join.await {
            Ok((task, result)) => {
                if let Err(err) = &result {
                    tracing::warn!("task {}: sweep attempt failed: {err}", task.name);
                }
                summary.record(&result);
            }
            Err(err) => {
                tracing::warn!("sweep attempt panicked: {err}");
                summary.failed += 1;
            }
        }
    }
    summary
}
