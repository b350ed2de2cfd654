//! Dispatch protocol - lock, gate, commit, release
//!
//! どのトリガー（periodic / 一斉 sweep）もここの [`Dispatcher::attempt`]
//! 一つを呼ぶ。攻めの順序は固定で、enabled 確認、ロック取得、ゲート付き
//! コミット、必ず解放。

pub mod gate;
mod lock;

use std::sync::Arc;

pub use gate::GateDecision;
pub use lock::{DEFAULT_LOCK_TTL, LockManager};

use crate::domain::{DispatchOutcome, TaskResource, TaskSpec};
use crate::ports::{
    Clock, CommitResult, DispatchRequest, DispatchStore, PayloadSource, StoreError,
    UlidTokenSource,
};

/// Runs the dispatch protocol for one task at a time.
///
/// Cheap to share behind an [`Arc`]; all state lives in the store.
pub struct Dispatcher {
    store: Arc<dyn DispatchStore>,
    clock: Arc<dyn Clock>,
    locks: LockManager,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn DispatchStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_lock_ttl(store, clock, DEFAULT_LOCK_TTL)
    }

    pub fn with_lock_ttl(
        store: Arc<dyn DispatchStore>,
        clock: Arc<dyn Clock>,
        ttl: std::time::Duration,
    ) -> Self {
        let tokens = Arc::new(UlidTokenSource::new(Arc::clone(&clock)));
        let locks = LockManager::with_ttl(Arc::clone(&store), tokens, ttl);
        Self {
            store,
            clock,
            locks,
        }
    }

    /// One dispatch attempt for one task.
    ///
    /// Never blocks on contention and never retries; losing the lock or the
    /// gate is a normal outcome, not an error. `Err` means the store itself
    /// failed, in which case nothing was dispatched.
    pub async fn attempt(&self, task: &TaskSpec) -> Result<DispatchOutcome, StoreError> {
        if !task.is_enabled() {
            tracing::debug!("task {}: switched off, skipping before the lock", task.name);
            return Ok(DispatchOutcome::SkippedDisabled);
        }

        let Some(token) = self.locks.acquire(&task.name).await? else {
            tracing::debug!("task {}: lock held elsewhere", task.name);
            return Ok(DispatchOutcome::SkippedLocked);
        };

        // ロックを取ったら、コミットの成否に関わらず必ず解放を通る
        let committed = self.commit(task).await;
        self.locks.release(&task.name, &token).await;

        match committed? {
            CommitResult::Committed { pushed } => {
                tracing::info!(
                    "task {}: dispatched {pushed} items to {}",
                    task.name,
                    task.queue_key
                );
                Ok(DispatchOutcome::Dispatched { pushed })
            }
            CommitResult::TooEarly { last_run } => {
                tracing::debug!(
                    "task {}: window still open, last dispatch at {last_run}",
                    task.name
                );
                Ok(DispatchOutcome::SkippedTooEarly)
            }
            CommitResult::EmptySnapshot => {
                tracing::debug!("task {}: candidate set is empty", task.name);
                Ok(DispatchOutcome::SkippedEmpty)
            }
        }
    }

    async fn commit(&self, task: &TaskSpec) -> Result<CommitResult, StoreError> {
        let payload = match &task.resource {
            TaskResource::Urls(urls) => PayloadSource::Urls(urls.as_slice()),
            TaskResource::RankedSet(set) => PayloadSource::Ranked(set.as_str()),
        };
        let req = DispatchRequest {
            task_name: &task.name,
            queue_key: &task.queue_key,
            payload,
            interval: task.interval(),
            // 判定と記録に同じ読み取りを使う
            now_epoch_secs: self.clock.epoch_secs(),
        };
        self.store.commit_dispatch(req).await
    }
}
