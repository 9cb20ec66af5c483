//! Impls - ObjectStore の実装
//!
//! # 含まれる実装
//! - **InMemoryObjectStore**: 開発用・テスト用（障害注入と close の観測つき）
//! - **LocalObjectStore**: ローカルディレクトリ
//! - **S3ObjectStore**: aws-sdk-s3（本番用）

pub mod inmem_store;
pub mod local_store;
pub mod s3_store;

pub use self::inmem_store::InMemoryObjectStore;
pub use self::local_store::LocalObjectStore;
pub use self::s3_store::S3ObjectStore;
