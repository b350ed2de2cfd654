//! Lock manager - タスク単位の分散 mutex
//!
//! 取得は set-if-absent + TTL、解放は compare-and-delete。取得は 1 回きりで
//! スピンしない。保持者ごとに一意なトークンを持つので、TTL 失効後に他者が
//! 取り直したロックを誤って消すことはない。

use std::sync::Arc;
use std::time::Duration;

use crate::ports::{DispatchStore, LockToken, StoreError, TokenSource};

/// How long a lock record survives a holder that never releases it.
/// Long enough for one commit round-trip, short enough that a crashed
/// holder frees its task within seconds.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

pub struct LockManager {
    store: Arc<dyn DispatchStore>,
    tokens: Arc<dyn TokenSource>,
    ttl: Duration,
}

impl LockManager {
    pub fn new(store: Arc<dyn DispatchStore>, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_ttl(store, tokens, DEFAULT_LOCK_TTL)
    }

    pub fn with_ttl(
        store: Arc<dyn DispatchStore>,
        tokens: Arc<dyn TokenSource>,
        ttl: Duration,
    ) -> Self {
        Self { store, tokens, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Single non-blocking attempt. `None` means another holder owns the
    /// task right now; the caller walks away and waits for its next trigger.
    pub async fn acquire(&self, task_name: &str) -> Result<Option<LockToken>, StoreError> {
        let token = self.tokens.next_token();
        if self.store.try_acquire(task_name, &token, self.ttl).await? {
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    /// Best-effort release on the way out of an attempt. Failures are logged
    /// and not retried; the TTL reclaims whatever a release misses.
    pub async fn release(&self, task_name: &str, token: &LockToken) {
        match self.store.release(task_name, token).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    "task {task_name}: lock already expired or re-acquired, nothing to release"
                );
            }
            Err(err) => {
                tracing::warn!("task {task_name}: lock release failed: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryStore;
    use crate::ports::{FixedClock, UlidTokenSource};

    fn manager_over(clock: Arc<FixedClock>) -> (LockManager, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let tokens = Arc::new(UlidTokenSource::new(clock));
        (LockManager::new(store.clone(), tokens), store)
    }

    #[tokio::test]
    async fn second_acquire_walks_away() {
        let clock = Arc::new(FixedClock::at_epoch_secs(0));
        let (manager, _store) = manager_over(clock);

        let held = manager.acquire("news").await.unwrap();
        assert!(held.is_some());
        assert!(manager.acquire("news").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn release_lets_the_next_acquire_through() {
        let clock = Arc::new(FixedClock::at_epoch_secs(0));
        let (manager, _store) = manager_over(clock);

        let token = manager.acquire("news").await.unwrap().unwrap();
        manager.release("news", &token).await;
        assert!(manager.acquire("news").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn locks_on_different_tasks_are_independent() {
        let clock = Arc::new(FixedClock::at_epoch_secs(0));
        let (manager, _store) = manager_over(clock);

        assert!(manager.acquire("news").await.unwrap().is_some());
        assert!(manager.acquire("forum").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_lock_can_be_taken_by_a_new_holder() {
        let clock = Arc::new(FixedClock::at_epoch_secs(0));
        let (manager, _store) = manager_over(clock.clone());

        let _stale = manager.acquire("news").await.unwrap().unwrap();
        clock.advance(DEFAULT_LOCK_TTL + Duration::from_secs(1));
        assert!(manager.acquire("news").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_token_release_leaves_the_new_holder_alone() {
        let clock = Arc::new(FixedClock::at_epoch_secs(0));
        let (manager, store) = manager_over(clock.clone());

        let stale = manager.acquire("news").await.unwrap().unwrap();
        clock.advance(DEFAULT_LOCK_TTL + Duration::from_secs(1));
        let fresh = manager.acquire("news").await.unwrap().unwrap();

        // 失効した保持者の解放は空振りし、現保持者のロックは残る
        manager.release("news", &stale).await;
        assert_eq!(store.lock_holder("news").await, Some(fresh));
        assert!(manager.acquire("news").await.unwrap().is_none());
    }
}
