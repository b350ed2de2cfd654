//! Implementations - port の具象
//!
//! ここには開発・テスト用の in-memory 実装だけを置く。Redis などの本番
//! ストア実装は、この port を実装する別クレートとして足す。

mod memory;

pub use memory::InMemoryStore;
