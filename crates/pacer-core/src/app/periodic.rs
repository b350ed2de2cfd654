//! Periodic trigger - 周期タイマーのループ群
//!
//! タスクごとに独立したタイマーループを 1 本ずつ回す。初回の発火は
//! 1 インターバル後で、起動直後には撃たない。

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dispatch::Dispatcher;
use crate::domain::TaskSpec;

/// Trigger group handle.
/// - `request_shutdown()` で全ループに停止を伝える
/// - `shutdown_and_join()` で全ループの終了を待てる
pub struct TriggerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl TriggerGroup {
    /// Spawn one timer loop per task.
    pub fn spawn(dispatcher: Arc<Dispatcher>, tasks: Vec<TaskSpec>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(tasks.len());
        for task in tasks {
            let d = Arc::clone(&dispatcher);
            let rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                trigger_loop(task, d, rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all loops. An in-flight attempt runs to
    /// completion; only new timer ticks stop.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all loops.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn trigger_loop(
    task: TaskSpec,
    dispatcher: Arc<Dispatcher>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut timer = tokio::time::interval(task.interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval は生成直後に一度発火する。初回を 1 インターバル後に
    // 回すため、その即時 tick は捨てる
    timer.tick().await;

    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        // tick は「待つ」ので select で shutdown と競合させる
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // sender が消えた場合もループを畳む
                    break;
                }
                continue;
            }
            _ = timer.tick() => {}
        }

        match dispatcher.attempt(&task).await {
            Ok(outcome) => {
                tracing::debug!("task {}: {outcome}", task.name);
            }
            Err(err) => {
                // ストア障害はこの tick を捨てるだけ。次の tick が再挑戦になる
                tracing::warn!("task {}: attempt failed: {err}", task.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryStore;
    use crate::ports::FixedClock;
    use std::time::Duration;

    fn rig() -> (Arc<FixedClock>, Arc<Dispatcher>, Arc<InMemoryStore>) {
        let clock = Arc::new(FixedClock::at_epoch_secs(0));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), clock.clone()));
        (clock, dispatcher, store)
    }

    #[tokio::test(start_paused = true)]
    async fn first_fire_waits_one_full_interval() {
        let (_clock, dispatcher, store) = rig();
        let task = TaskSpec::crawl("news", 1, "queue:news", vec!["http://a".into()]);
        let group = TriggerGroup::spawn(dispatcher, vec![task]);

        // 起動直後には撃たない
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.queue_len("queue:news").await, 0);

        // 1 インターバル経過で最初の 1 発
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.queue_len("queue:news").await, 1);

        group.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn each_tick_runs_a_fresh_attempt() {
        let (clock, dispatcher, store) = rig();
        let task = TaskSpec::crawl("news", 1, "queue:news", vec!["http://a".into()]);
        let group = TriggerGroup::spawn(dispatcher, vec![task]);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.queue_len("queue:news").await, 1);

        // 実時間も進むと次の tick のゲートが開く
        clock.advance(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.queue_len("queue:news").await, 2);

        group.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn every_task_gets_its_own_timer() {
        let (_clock, dispatcher, store) = rig();
        let fast = TaskSpec::crawl("fast", 1, "queue:fast", vec!["http://f".into()]);
        let slow = TaskSpec::crawl("slow", 2, "queue:slow", vec!["http://s".into()]);
        let group = TriggerGroup::spawn(dispatcher, vec![fast, slow]);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.queue_len("queue:fast").await, 1);
        assert_eq!(store.queue_len("queue:slow").await, 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.queue_len("queue:slow").await, 1);

        group.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_joins_without_waiting_for_the_next_tick() {
        let (_clock, dispatcher, store) = rig();
        // 1 時間間隔のタスクでも join は即座に返る
        let task = TaskSpec::crawl("hourly", 60, "queue:hourly", vec!["http://h".into()]);
        let group = TriggerGroup::spawn(dispatcher, vec![task]);

        tokio::time::timeout(Duration::from_secs(5), group.shutdown_and_join())
            .await
            .expect("join returned before the first tick");
        assert_eq!(store.queue_len("queue:hourly").await, 0);
    }
}
