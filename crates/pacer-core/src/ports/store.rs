//! DispatchStore port - 共有ストアの抽象化
//!
//! ロックレコード・recorder・ワークキュー・候補セットは一つの共有ストアに
//! 置かれ、複数のスケジューラプロセスはそこでだけ合流する。
//!
//! # 設計原則
//! - ロック操作は単一のアトミック primitive に対応させる
//!   （set-if-absent + TTL / compare-and-delete）。read-then-write に
//!   分解してはならない
//! - `commit_dispatch` はゲート判定・キュー push・recorder 書き込みを
//!   一つのトランザクションとして実行する。部分適用は観測されない
//! - 本番実装（Redis など）は別クレートに置き、このクレートには
//!   開発・テスト用の in-memory 実装だけを置く

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::token::LockToken;

/// Which end of a queue receives pushed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEnd {
    Head,
    Tail,
}

/// Payload of one commit, borrowed from the task descriptor.
#[derive(Debug, Clone, Copy)]
pub enum PayloadSource<'a> {
    /// Fixed items, pushed one at a time onto the queue head. The first item
    /// of the list ends up deepest.
    Urls(&'a [String]),
    /// Snapshot of the named score-ranked set, taken inside the transaction
    /// and appended to the queue tail, highest score first.
    Ranked(&'a str),
}

impl PayloadSource<'_> {
    /// Push direction is a family contract, not a store choice.
    pub fn queue_end(&self) -> QueueEnd {
        match self {
            PayloadSource::Urls(_) => QueueEnd::Head,
            PayloadSource::Ranked(_) => QueueEnd::Tail,
        }
    }
}

/// One gate-and-commit request.
///
/// `now_epoch_secs` は呼び出し側が一度だけ読んだ時刻。ゲート判定にも
/// recorder の新しい値にも、この同じ値を使う。
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub task_name: &'a str,
    pub queue_key: &'a str,
    pub payload: PayloadSource<'a>,
    /// Minimum spacing since the last recorded dispatch.
    pub interval: Duration,
    pub now_epoch_secs: i64,
}

/// What a commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    /// Items were pushed and the recorder now reads `now_epoch_secs`.
    Committed { pushed: usize },
    /// The gate held: a dispatch at `last_run` is still inside the window.
    TooEarly { last_run: i64 },
    /// The ranked snapshot had zero members; queue and recorder untouched.
    EmptySnapshot,
}

/// Store failures. Transient by assumption; the next trigger is the retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// 共有ストアの port。ロックと recorder の唯一の正はこのストア。
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Create the lock record for `task_name` only if none exists, with the
    /// given time-to-live. Returns `false` when another holder owns it.
    /// Single attempt; never blocks or retries.
    async fn try_acquire(
        &self,
        task_name: &str,
        token: &LockToken,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Compare-and-delete: remove the lock record only while it still holds
    /// `token`. Returns `false` when the record is gone or owned by someone
    /// else, which happens after TTL expiry plus re-acquisition.
    async fn release(&self, task_name: &str, token: &LockToken) -> Result<bool, StoreError>;

    /// Evaluate the interval gate against the recorder and, if it passes,
    /// apply the queue push and the recorder write as one atomic unit.
    async fn commit_dispatch(&self, req: DispatchRequest<'_>) -> Result<CommitResult, StoreError>;
}
