//! pacer-core
//!
//! Core building blocks for the pacer dispatch scheduler: a shared-store
//! protocol that lets any number of scheduler processes fire the same task
//! catalog while each task dispatches at most once per interval.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskSpec, TaskCatalog, DispatchOutcome）
//! - **ports**: 抽象化レイヤー（DispatchStore, Clock, TokenSource）
//! - **dispatch**: プロトコル本体（LockManager, gate, Dispatcher）
//! - **impls**: 実装（InMemoryStore など開発用）
//! - **app**: トリガーハーネス（TriggerGroup, sweep_all）

pub mod app;
pub mod dispatch;
pub mod domain;
pub mod impls;
pub mod ports;
