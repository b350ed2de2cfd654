//! Application layer - トリガーハーネス
//!
//! いつ attempt を撃つかはここで決める。撃ち方は 2 通り:
//! タスクごとの周期タイマー([`TriggerGroup`])と、全タスク一斉の
//! 単発 sweep([`sweep_all`])。

mod periodic;
mod sweep;

pub use periodic::TriggerGroup;
pub use sweep::{SweepSummary, sweep_all};
