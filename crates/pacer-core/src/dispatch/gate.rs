//! Idempotency gate - インターバル判定
//!
//! recorder の前回値と今回の時刻だけから「この attempt で配信してよいか」を
//! 決める純粋関数。副作用（push と recorder 書き込み）はストアの
//! トランザクション側にあり、判定はその内側で呼ばれる。

use std::time::Duration;

/// Gate decision for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No previous run on record, or the interval has fully elapsed.
    Proceed,
    /// A dispatch at `last_run` is still inside the interval window.
    TooEarly { last_run: i64 },
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

/// Decide whether `interval` has elapsed since the recorded last run.
///
/// `recorded` is the raw recorder field: `None` when the task has never
/// dispatched, otherwise decimal epoch seconds. A value that does not parse
/// is treated as absent so a corrupted field cannot block its task forever;
/// each occurrence is logged at warn. Equality counts as elapsed: a 5 minute
/// task dispatched at t=0 runs again at exactly t=300.
pub fn evaluate(
    task_name: &str,
    recorded: Option<&str>,
    now_epoch_secs: i64,
    interval: Duration,
) -> GateDecision {
    let Some(raw) = recorded else {
        return GateDecision::Proceed;
    };
    let last_run = match raw.trim().parse::<i64>() {
        Ok(secs) => secs,
        Err(_) => {
            tracing::warn!(
                "task {task_name}: recorder value {raw:?} is not decimal seconds, treating as never dispatched"
            );
            return GateDecision::Proceed;
        }
    };
    if now_epoch_secs - last_run >= interval.as_secs() as i64 {
        GateDecision::Proceed
    } else {
        GateDecision::TooEarly { last_run }
    }
}
