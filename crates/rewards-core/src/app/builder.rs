//! AppBuilder - Config と ObjectStore のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）

use super::card_fetcher::CardFetcher;
use crate::config::{Config, ConfigError, StorageBackend};
use crate::impls::{LocalObjectStore, S3ObjectStore};
use crate::ports::ObjectStore;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(Config::from_env()?).build().await?;
/// let cards = app.fetcher.fetch_cards_as_bytes(&cancel).await?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に Config を再検証
/// - Local バックエンドの root がディレクトリでなければ BuildError
/// - root を stat できない（権限など）場合は io::Error を持って BuildError
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn ObjectStore>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("local storage root {0} is not a directory")]
    LocalRootMissing(PathBuf),

    #[error("local storage root {path} is unreadable: {source}")]
    LocalRootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// StorageConfig を無視して、この ObjectStore を使う
    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => connect_store(&self.config).await?,
        };
        tracing::info!(
            backend = %self.config.storage.backend,
            location = %self.config.cards.location(),
            "rewards app built"
        );

        Ok(App {
            fetcher: CardFetcher::new(store, self.config.cards.clone()),
            config: self.config,
        })
    }
}

async fn connect_store(config: &Config) -> Result<Arc<dyn ObjectStore>, BuildError> {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::S3 => Ok(Arc::new(S3ObjectStore::from_config(storage).await)),
        StorageBackend::Local => {
            match tokio::fs::metadata(&storage.local_root).await {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => return Err(BuildError::LocalRootMissing(storage.local_root.clone())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(BuildError::LocalRootMissing(storage.local_root.clone()));
                }
                Err(source) => {
                    return Err(BuildError::LocalRootUnreadable {
                        path: storage.local_root.clone(),
                        source,
                    });
                }
            }
            Ok(Arc::new(LocalObjectStore::new(&storage.local_root)))
        }
    }
}

/// App は構築済みのアプリケーション
#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub fetcher: CardFetcher,
}
