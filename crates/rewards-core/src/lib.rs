//! rewards-core
//!
//! Reward cards を object storage から取得するためのコア部品。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（CardBytes, CardsDocument, ObjectLocation, StorageError）
//! - **ports**: 抽象化レイヤー（ObjectStore, ObjectBody）
//! - **impls**: ObjectStore の実装（InMemory / Local / S3）
//! - **app**: アプリケーションロジック（CardFetcher, AppBuilder）
//! - **config**: 環境変数からの設定読み込み

pub mod domain;
pub mod ports;
pub mod impls;
pub mod app;
pub mod config;

pub use self::app::{App, AppBuilder, CardFetcher};
pub use self::config::{CardsConfig, Config, ConfigError, StorageBackend, StorageConfig};
pub use self::domain::{CardBytes, ObjectLocation, StorageError};
pub use self::ports::{ObjectBody, ObjectStore};
