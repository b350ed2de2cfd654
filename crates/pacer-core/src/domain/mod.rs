//! Domain layer - タスク記述子と attempt 結果
//!
//! ここにはストアにもランタイムにも依存しない型だけを置く。

mod catalog;
mod outcome;
mod task;

pub use catalog::TaskCatalog;
pub use outcome::DispatchOutcome;
pub use task::{TaskResource, TaskSpec};
