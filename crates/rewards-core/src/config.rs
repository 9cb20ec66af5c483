//! Config - 環境変数からの設定読み込み
//!
//! `.env` があれば読み込んだ上で、以下の環境変数を参照します。
//!
//! | 変数 | 既定値 |
//! |---|---|
//! | `REWARDS_CARDS_BUCKET` | 必須 |
//! | `REWARDS_CARDS_KEY` | `cards.json` |
//! | `REWARDS_CARDS_FETCH_TIMEOUT_MS` | なし |
//! | `REWARDS_STORAGE_BACKEND` | `s3`（`s3` / `local`） |
//! | `AWS_REGION` | SDK のデフォルトチェーン |
//! | `REWARDS_S3_ENDPOINT` | なし |
//! | `REWARDS_LOCAL_ROOT` | `.` |

use crate::domain::ObjectLocation;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CARDS_BUCKET: &str = "REWARDS_CARDS_BUCKET";
pub const ENV_CARDS_KEY: &str = "REWARDS_CARDS_KEY";
pub const ENV_CARDS_FETCH_TIMEOUT_MS: &str = "REWARDS_CARDS_FETCH_TIMEOUT_MS";
pub const ENV_STORAGE_BACKEND: &str = "REWARDS_STORAGE_BACKEND";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_S3_ENDPOINT: &str = "REWARDS_S3_ENDPOINT";
pub const ENV_LOCAL_ROOT: &str = "REWARDS_LOCAL_ROOT";

pub const DEFAULT_CARDS_KEY: &str = "cards.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cards: CardsConfig,
    pub storage: StorageConfig,
}

/// CardsConfig は cards ドキュメントの置き場所
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardsConfig {
    pub bucket: String,
    pub key: String,
    /// open から読み終わりまで全体の上限
    pub fetch_timeout: Option<Duration>,
}

impl CardsConfig {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            fetch_timeout: None,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), self.key.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown storage backend {other:?} (expected s3 or local)")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 => f.write_str("s3"),
            Self::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            region: None,
            endpoint: None,
            local_root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// `.env` とプロセスの環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|_| None)
    }

    /// `overrides` が値を返した変数は環境変数より優先する
    ///
    /// CLI フラグのように、環境変数の不正値を上書きで回避できる必要がある場合に使います。
    pub fn from_env_with<O>(overrides: O) -> Result<Self, ConfigError>
    where
        O: Fn(&str) -> Option<String>,
    {
        dotenvy::dotenv().ok();
        Self::from_lookup_with(overrides, |name| env::var(name).ok())
    }

    /// `overrides` → `lookup` の順に引く
    pub fn from_lookup_with<O, F>(overrides: O, lookup: F) -> Result<Self, ConfigError>
    where
        O: Fn(&str) -> Option<String>,
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|name| overrides(name).or_else(|| lookup(name)))
    }

    /// 任意の lookup から読み込む（空文字・空白のみは未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bucket = get(ENV_CARDS_BUCKET).ok_or(ConfigError::Missing(ENV_CARDS_BUCKET))?;
        let key = get(ENV_CARDS_KEY).unwrap_or_else(|| DEFAULT_CARDS_KEY.to_string());
        let fetch_timeout = get(ENV_CARDS_FETCH_TIMEOUT_MS)
            .map(|raw| {
                raw.parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| ConfigError::Invalid {
                        name: ENV_CARDS_FETCH_TIMEOUT_MS,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        let backend = match get(ENV_STORAGE_BACKEND) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: ENV_STORAGE_BACKEND,
                value: raw.clone(),
                reason,
            })?,
            None => StorageBackend::default(),
        };

        let config = Self {
            cards: CardsConfig {
                bucket,
                key,
                fetch_timeout,
            },
            storage: StorageConfig {
                backend,
                region: get(ENV_AWS_REGION),
                endpoint: get(ENV_S3_ENDPOINT),
                local_root: get(ENV_LOCAL_ROOT)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// 上書き後の値も含めて検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cards.bucket.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_CARDS_BUCKET));
        }
        if self.cards.key.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_CARDS_KEY));
        }
        if self.cards.fetch_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid {
                name: ENV_CARDS_FETCH_TIMEOUT_MS,
                value: "0".to_string(),
                reason: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
