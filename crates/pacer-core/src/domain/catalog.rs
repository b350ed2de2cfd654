//! Task catalog - 設定ファイル由来のタスク一覧

use serde::{Deserialize, Serialize};

use super::task::TaskSpec;

/// The full set of tasks a scheduler process is responsible for, grouped by
/// family. Order within each list is preserved; sweeps and trigger groups
/// walk crawler tasks first, then validator tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCatalog {
    #[serde(default)]
    pub crawler_tasks: Vec<TaskSpec>,
    #[serde(default)]
    pub validator_tasks: Vec<TaskSpec>,
}

impl TaskCatalog {
    /// Parse a catalog from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// All tasks in walk order.
    pub fn all(&self) -> impl Iterator<Item = &TaskSpec> {
        self.crawler_tasks.iter().chain(self.validator_tasks.iter())
    }

    /// Owned copy of the walk order, for handing to spawned triggers.
    pub fn to_vec(&self) -> Vec<TaskSpec> {
        self.all().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.crawler_tasks.len() + self.validator_tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawler_tasks.is_empty() && self.validator_tasks.is_empty()
    }
}
