//! Dispatch outcome - 1 回の attempt が何をしたか

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of one dispatch attempt.
///
/// Exactly one of these is produced per attempt; every skip names the stage
/// that stopped it, so logs read the same across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Items were pushed and the recorder advanced, as one unit.
    Dispatched { pushed: usize },
    /// The interval window since the last dispatch is still open.
    SkippedTooEarly,
    /// Another holder owns the task lock right now.
    SkippedLocked,
    /// The candidate snapshot was empty; nothing was written.
    SkippedEmpty,
    /// The task is switched off in the catalog; no lock was taken.
    SkippedDisabled,
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched { .. })
    }

    /// Stable label for logs and counters.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Dispatched { .. } => "dispatched",
            DispatchOutcome::SkippedTooEarly => "skipped-too-early",
            DispatchOutcome::SkippedLocked => "skipped-locked",
            DispatchOutcome::SkippedEmpty => "skipped-empty",
            DispatchOutcome::SkippedDisabled => "skipped-disabled",
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Dispatched { pushed } => write!(f, "dispatched ({pushed} items)"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_dispatched_counts_as_dispatched() {
        assert!(DispatchOutcome::Dispatched { pushed: 3 }.is_dispatched());
        assert!(!DispatchOutcome::SkippedTooEarly.is_dispatched());
        assert!(!DispatchOutcome::SkippedLocked.is_dispatched());
        assert!(!DispatchOutcome::SkippedEmpty.is_dispatched());
        assert!(!DispatchOutcome::SkippedDisabled.is_dispatched());
    }

    #[test]
    fn display_includes_the_item_count() {
        assert_eq!(
            DispatchOutcome::Dispatched { pushed: 2 }.to_string(),
            "dispatched (2 items)"
        );
        assert_eq!(
            DispatchOutcome::SkippedLocked.to_string(),
            "skipped-locked"
        );
    }
}
