use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

use pacer_core::app::{TriggerGroup, sweep_all};
use pacer_core::dispatch::Dispatcher;
use pacer_core::domain::TaskCatalog;
use pacer_core::impls::InMemoryStore;
use pacer_core::ports::{Clock, SystemClock};

const CATALOG_JSON: &str = r#"
{
    "crawler_tasks": [
        {
            "name": "news_front",
            "interval_minutes": 5,
            "enabled": true,
            "queue_key": "queue:crawl:news",
            "resource": { "urls": ["http://news.example/politics", "http://news.example/tech"] }
        },
        {
            "name": "forum_hot",
            "interval_minutes": 10,
            "enabled": false,
            "queue_key": "queue:crawl:forum",
            "resource": { "urls": ["http://forum.example/hot"] }
        }
    ],
    "validator_tasks": [
        {
            "name": "proxy_check",
            "interval_minutes": 30,
            "queue_key": "queue:validate",
            "resource": { "ranked_set": "proxies:scored" }
        }
    ]
}
"#;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) カタログと共有ストアを用意
    let catalog = TaskCatalog::from_json(CATALOG_JSON).expect("demo catalog parses");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryStore::new(clock.clone()));
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), clock));
    let tasks = catalog.to_vec();
    tracing::info!("catalog loaded with {} tasks", tasks.len());

    // (B) validator が読む候補セットを仮置き（本番では収集側が書く）
    store
        .add_candidate("proxies:scored", "http://10.0.0.1:8080", 9.5)
        .await;
    store
        .add_candidate("proxies:scored", "http://10.0.0.2:8080", 3.1)
        .await;
    store
        .add_candidate("proxies:scored", "http://10.0.0.3:8080", 7.7)
        .await;

    // (C) 同じカタログを 2 プロセスが同時に蹴る状況を再現（配信は各タスク 1 回）
    let (first, rival) = tokio::join!(
        sweep_all(dispatcher.clone(), &tasks),
        sweep_all(dispatcher.clone(), &tasks),
    );
    println!("sweep #1      : {first:?}");
    println!("rival sweep   : {rival:?}");
    println!(
        "news queue    : {:?}",
        store.queue_items("queue:crawl:news").await
    );
    println!(
        "validate queue: {:?}",
        store.queue_items("queue:validate").await
    );

    // (D) すぐの蹴り直しは窓に弾かれる
    let again = sweep_all(dispatcher.clone(), &tasks).await;
    println!("sweep #2      : {again:?}");

    // (E) 周期モード。初回の発火は 1 インターバル後なので、デモでは起動と
    //     graceful shutdown だけ見せる
    let group = TriggerGroup::spawn(dispatcher, tasks);
    sleep(Duration::from_millis(500)).await;
    group.shutdown_and_join().await;
    println!("trigger group stopped cleanly");
}
