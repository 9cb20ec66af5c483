//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! ObjectStore は外部の Blob storage（S3 / MinIO / ローカル）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod object_store;

pub use self::object_store::{ObjectBody, ObjectStore};
