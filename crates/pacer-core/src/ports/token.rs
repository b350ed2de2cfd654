//! TokenSource port - ロックトークンの払い出し
//!
//! 解放が compare-and-delete である以上、トークンは保持者ごとに一意で
//! なければならない。値そのものに意味はなく、照合にだけ使う。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::clock::Clock;

/// Opaque holder token stored in a lock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockToken(Ulid);

impl LockToken {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TokenSource はロックトークンを払い出す
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> LockToken;
}

/// ULID ベースの TokenSource。timestamp 部は Clock から取る。
///
/// FixedClock の下でも random 部が異なるので、同時刻の 2 保持者が同じ
/// トークンを掴むことはない。
pub struct UlidTokenSource {
    clock: Arc<dyn Clock>,
}

impl UlidTokenSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl TokenSource for UlidTokenSource {
    fn next_token(&self) -> LockToken {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        LockToken::from_ulid(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
