//! Ports - 差し替え可能な境界
//!
//! プロトコル本体が依存するのはここにある trait だけ。本番のストア実装や
//! OS 時計は、この境界の外から注入する。

mod clock;
mod store;
mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{
    CommitResult, DispatchRequest, DispatchStore, PayloadSource, QueueEnd, StoreError,
};
pub use token::{LockToken, TokenSource, UlidTokenSource};
