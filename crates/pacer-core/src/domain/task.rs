//! Task descriptor - 配信タスクの記述子
//!
//! クロール系・検証系の両ファミリを一つの型で表す。違いは resource の
//! バリアントと enabled の有無だけで、プロトコル本体は共通。

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a task pushes onto its queue.
///
/// The variant also fixes which end of the queue receives the items:
/// a fixed URL list goes to the head, a ranked snapshot goes to the tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResource {
    /// Pre-known URL list, carried in the descriptor itself.
    Urls(Vec<String>),
    /// Name of a score-ranked candidate set in the shared store. The set is
    /// read at dispatch time, highest score first.
    RankedSet(String),
}

/// One named, recurring unit of dispatch work.
///
/// `name` は lock レコードと recorder フィールドのキーにもなるので、
/// カタログ全体で一意であること。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique key across the catalog.
    pub name: String,
    /// Minimum spacing between two successful dispatches.
    pub interval_minutes: u64,
    /// Crawl tasks can be switched off in the catalog without being removed.
    /// `None` means the task has no switch and is always attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Target queue key in the shared store.
    pub queue_key: String,
    /// What gets pushed.
    pub resource: TaskResource,
}

impl TaskSpec {
    /// Crawl-family task: fixed URL list, enabled by default.
    pub fn crawl(
        name: impl Into<String>,
        interval_minutes: u64,
        queue_key: impl Into<String>,
        urls: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            interval_minutes,
            enabled: Some(true),
            queue_key: queue_key.into(),
            resource: TaskResource::Urls(urls),
        }
    }

    /// Validator-family task: reads the named candidate set at dispatch time.
    /// Carries no switch.
    pub fn validator(
        name: impl Into<String>,
        interval_minutes: u64,
        queue_key: impl Into<String>,
        candidate_set: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            interval_minutes,
            enabled: None,
            queue_key: queue_key.into(),
            resource: TaskResource::RankedSet(candidate_set.into()),
        }
    }

    /// Builder-style switch-off, mainly for catalogs assembled in code.
    pub fn disabled(mut self) -> Self {
        self.enabled = Some(false);
        self
    }

    /// A task without a switch counts as enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Dispatch interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}
