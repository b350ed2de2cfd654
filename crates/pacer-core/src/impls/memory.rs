//! In-memory store implementation.
//!
//! 開発とテスト用。単一の async mutex の内側でゲート判定・push・recorder
//! 書き込みを行うので、commit は構造的に all-or-nothing になる。TTL の失効は
//! Clock 基準で判定し、失効したレコードは存在しない扱いにする。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::dispatch::{GateDecision, gate};
use crate::ports::{
    Clock, CommitResult, DispatchRequest, DispatchStore, LockToken, PayloadSource, QueueEnd,
    StoreError,
};

/// One live lock record.
struct LockEntry {
    token: LockToken,
    expires_at_millis: i64,
}

/// In-memory store state.
#[derive(Default)]
struct StoreState {
    /// Lock records, keyed by task name.
    locks: HashMap<String, LockEntry>,

    /// Recorder fields, keyed by task name. Values are raw strings; parsing
    /// happens in the gate.
    recorder: HashMap<String, String>,

    /// Work queues. Front of the deque is the head of the queue.
    queues: HashMap<String, VecDeque<String>>,

    /// Score-ranked candidate sets, keyed by set name.
    ranked: HashMap<String, Vec<(String, f64)>>,
}

impl StoreState {
    /// Members of a ranked set, highest score first. Missing set reads as
    /// empty.
    fn ranked_snapshot(&self, set: &str) -> Vec<String> {
        let Some(members) = self.ranked.get(set) else {
            return Vec::new();
        };
        let mut members = members.clone();
        members.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        members.into_iter().map(|(member, _)| member).collect()
    }
}

/// In-memory [`DispatchStore`].
///
/// Production deployments plug a real shared store in behind the same port;
/// this one is the development default and the fixture every protocol test
/// runs against.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// Insert a candidate into a ranked set, or update its score if the
    /// member is already present.
    pub async fn add_candidate(&self, set: &str, member: &str, score: f64) {
        let mut state = self.state.lock().await;
        let members = state.ranked.entry(set.to_string()).or_default();
        match members.iter_mut().find(|(m, _)| m == member) {
            Some(entry) => entry.1 = score,
            None => members.push((member.to_string(), score)),
        }
    }

    /// Queue contents, head first.
    pub async fn queue_items(&self, queue_key: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .queues
            .get(queue_key)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn queue_len(&self, queue_key: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue_key).map(VecDeque::len).unwrap_or(0)
    }

    /// Raw recorder field for a task, if any.
    pub async fn last_run(&self, task_name: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.recorder.get(task_name).cloned()
    }

    /// Overwrite a recorder field with an arbitrary raw value (for testing).
    #[cfg(test)]
    pub async fn set_last_run_raw(&self, task_name: &str, value: &str) {
        let mut state = self.state.lock().await;
        state.recorder.insert(task_name.to_string(), value.to_string());
    }

    /// Current unexpired lock holder for a task (for testing).
    #[cfg(test)]
    pub async fn lock_holder(&self, task_name: &str) -> Option<LockToken> {
        let now_millis = self.clock.epoch_millis();
        let state = self.state.lock().await;
        state
            .locks
            .get(task_name)
            .filter(|entry| entry.expires_at_millis > now_millis)
            .map(|entry| entry.token)
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    async fn try_acquire(
        &self,
        task_name: &str,
        token: &LockToken,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now_millis = self.clock.epoch_millis();
        let mut state = self.state.lock().await;
        match state.locks.get(task_name) {
            Some(entry) if entry.expires_at_millis > now_millis => Ok(false),
            // 失効したレコードは上書きしてよい
            _ => {
                state.locks.insert(
                    task_name.to_string(),
                    LockEntry {
                        token: *token,
                        expires_at_millis: now_millis + ttl.as_millis() as i64,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn release(&self, task_name: &str, token: &LockToken) -> Result<bool, StoreError> {
        let now_millis = self.clock.epoch_millis();
        let mut state = self.state.lock().await;
        match state.locks.get(task_name) {
            // 失効済みは存在しない扱い。TTL つきストアでキーが消えるのと同じ
            Some(entry) if entry.token == *token && entry.expires_at_millis > now_millis => {
                state.locks.remove(task_name);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_dispatch(&self, req: DispatchRequest<'_>) -> Result<CommitResult, StoreError> {
        let mut state = self.state.lock().await;

        let decision = gate::evaluate(
            req.task_name,
            state.recorder.get(req.task_name).map(String::as_str),
            req.now_epoch_secs,
            req.interval,
        );
        if let GateDecision::TooEarly { last_run } = decision {
            return Ok(CommitResult::TooEarly { last_run });
        }

        let items: Vec<String> = match req.payload {
            PayloadSource::Urls(urls) => urls.to_vec(),
            PayloadSource::Ranked(set) => {
                let snapshot = state.ranked_snapshot(set);
                if snapshot.is_empty() {
                    return Ok(CommitResult::EmptySnapshot);
                }
                snapshot
            }
        };

        let pushed = items.len();
        let queue = state.queues.entry(req.queue_key.to_string()).or_default();
        match req.payload.queue_end() {
            // 1 件ずつ head に積む。リスト先頭の要素が最も奥になる
            QueueEnd::Head => {
                for item in items {
                    queue.push_front(item);
                }
            }
            QueueEnd::Tail => queue.extend(items),
        }

        state
            .recorder
            .insert(req.task_name.to_string(), req.now_epoch_secs.to_string());
        Ok(CommitResult::Committed { pushed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use ulid::Ulid;

    fn token(n: u128) -> LockToken {
        LockToken::from_ulid(Ulid::from_parts(0, n))
    }

    fn store_at(secs: i64) -> (Arc<FixedClock>, InMemoryStore) {
        let clock = Arc::new(FixedClock::at_epoch_secs(secs));
        let store = InMemoryStore::new(clock.clone());
        (clock, store)
    }

    fn urls_request<'a>(urls: &'a [String], now: i64) -> DispatchRequest<'a> {
        DispatchRequest {
            task_name: "news",
            queue_key: "queue:crawl:news",
            payload: PayloadSource::Urls(urls),
            interval: Duration::from_secs(300),
            now_epoch_secs: now,
        }
    }

    #[tokio::test]
    async fn acquire_is_exclusive_until_the_ttl_passes() {
        let (clock, store) = store_at(0);
        let ttl = Duration::from_secs(10);

        assert!(store.try_acquire("news", &token(1), ttl).await.unwrap());
        assert!(!store.try_acquire("news", &token(2), ttl).await.unwrap());

        clock.advance(Duration::from_secs(11));
        assert!(store.try_acquire("news", &token(3), ttl).await.unwrap());
        assert_eq!(store.lock_holder("news").await, Some(token(3)));
    }

    #[tokio::test]
    async fn release_requires_the_matching_token() {
        let (_clock, store) = store_at(0);
        let ttl = Duration::from_secs(10);
        store.try_acquire("news", &token(1), ttl).await.unwrap();

        assert!(!store.release("news", &token(2)).await.unwrap());
        assert_eq!(store.lock_holder("news").await, Some(token(1)));

        assert!(store.release("news", &token(1)).await.unwrap());
        assert_eq!(store.lock_holder("news").await, None);
    }

    #[tokio::test]
    async fn expired_record_reads_as_absent_on_release() {
        let (clock, store) = store_at(0);
        store
            .try_acquire("news", &token(1), Duration::from_secs(10))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(11));
        assert!(!store.release("news", &token(1)).await.unwrap());
    }

    #[tokio::test]
    async fn url_payloads_stack_onto_the_queue_head() {
        let (_clock, store) = store_at(0);
        let urls: Vec<String> = ["http://a", "http://b", "http://c"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = store.commit_dispatch(urls_request(&urls, 0)).await.unwrap();

        assert_eq!(result, CommitResult::Committed { pushed: 3 });
        assert_eq!(
            store.queue_items("queue:crawl:news").await,
            vec!["http://c", "http://b", "http://a"]
        );
    }

    #[tokio::test]
    async fn gate_holds_inside_the_transaction() {
        let (_clock, store) = store_at(0);
        let urls = vec!["http://a".to_string()];

        store.commit_dispatch(urls_request(&urls, 100)).await.unwrap();
        let held = store.commit_dispatch(urls_request(&urls, 150)).await.unwrap();

        assert_eq!(held, CommitResult::TooEarly { last_run: 100 });
        assert_eq!(store.queue_len("queue:crawl:news").await, 1);
        assert_eq!(store.last_run("news").await.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn committed_recorder_reads_back_as_decimal_seconds() {
        let (_clock, store) = store_at(0);
        let urls = vec!["http://a".to_string()];

        store.commit_dispatch(urls_request(&urls, 400)).await.unwrap();
        assert_eq!(store.last_run("news").await.as_deref(), Some("400"));
    }

    #[tokio::test]
    async fn ranked_snapshot_orders_by_descending_score() {
        let (_clock, store) = store_at(0);
        store.add_candidate("proxies", "low", 0.5).await;
        store.add_candidate("proxies", "high", 9.9).await;
        store.add_candidate("proxies", "mid", 4.2).await;

        let req = DispatchRequest {
            task_name: "proxy_check",
            queue_key: "queue:validate",
            payload: PayloadSource::Ranked("proxies"),
            interval: Duration::from_secs(300),
            now_epoch_secs: 0,
        };
        let result = store.commit_dispatch(req).await.unwrap();

        assert_eq!(result, CommitResult::Committed { pushed: 3 });
        assert_eq!(
            store.queue_items("queue:validate").await,
            vec!["high", "mid", "low"]
        );
    }

    #[tokio::test]
    async fn add_candidate_updates_scores_in_place() {
        let (_clock, store) = store_at(0);
        store.add_candidate("proxies", "a", 1.0).await;
        store.add_candidate("proxies", "b", 2.0).await;
        store.add_candidate("proxies", "a", 5.0).await;

        let req = DispatchRequest {
            task_name: "proxy_check",
            queue_key: "queue:validate",
            payload: PayloadSource::Ranked("proxies"),
            interval: Duration::from_secs(300),
            now_epoch_secs: 0,
        };
        store.commit_dispatch(req).await.unwrap();

        assert_eq!(store.queue_items("queue:validate").await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_ranked_set_commits_nothing() {
        let (_clock, store) = store_at(0);
        let req = DispatchRequest {
            task_name: "proxy_check",
            queue_key: "queue:validate",
            payload: PayloadSource::Ranked("proxies"),
            interval: Duration::from_secs(300),
            now_epoch_secs: 77,
        };

        assert_eq!(
            store.commit_dispatch(req).await.unwrap(),
            CommitResult::EmptySnapshot
        );
        assert_eq!(store.queue_len("queue:validate").await, 0);
        assert_eq!(store.last_run("proxy_check").await, None);
    }
}
