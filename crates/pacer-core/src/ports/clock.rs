//! Clock port - 時刻の抽象化
//!
//! インターバル判定と TTL 失効はどちらも「今」に依存する。時刻を trait で
//! 注入しておくと、テストでは FixedClock で境界そのものを踏める。

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Clock は「今」を返す
///
/// # 設計原則
/// - 1 回の attempt では時刻を一度だけ読み、その値を判定と記録の両方に使う
/// - recorder に入るのは epoch 秒、ロックの期限は epoch ミリ秒
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Unix epoch seconds; the unit the recorder stores.
    fn epoch_secs(&self) -> i64 {
        self.now().timestamp()
    }

    /// Unix epoch milliseconds; the unit lock deadlines use.
    fn epoch_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// 本番用。OS の時計をそのまま返す。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// テスト用。固定時刻から始まり、`advance` / `set` で手動で進める。
///
/// 内部はミリ秒の atomic なので `&self` のまま共有して動かせる。
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Start at an epoch-second offset; protocol tests mostly count in
    /// seconds from zero.
    pub fn at_epoch_secs(secs: i64) -> Self {
        Self {
            millis: AtomicI64::new(secs * 1000),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).expect("fixed clock millis in chrono range")
    }
}
