//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **CardFetcher**: cards ドキュメントの取得
//! - **AppBuilder**: Config と ObjectStore のワイヤリング

pub mod builder;
pub mod card_fetcher;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::card_fetcher::CardFetcher;
