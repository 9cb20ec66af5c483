//! Errors - ストレージ取得のエラー型
//!
//! ObjectStore の実装はネイティブのエラーをこの型に変換して返します。
//! CardFetcher はこの値をそのまま呼び出し元に返す（ラップしない）ため、
//! 呼び出し側は `==` や `matches!` で判定できます。

use super::location::ObjectLocation;
use std::time::Duration;

/// StorageError は object の取得・読み込みで発生するエラー
///
/// # 分類
/// - NotFound: object が存在しない
/// - AccessDenied: 権限不足（Local では root 外へのアクセスも含む）
/// - Transport: ネットワーク・I/O・body 読み込みの失敗
/// - Cancelled: CancellationToken による中断
/// - DeadlineExceeded: fetch_timeout の超過
/// - Other: その他のバックエンドエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(ObjectLocation),

    #[error("access denied: {0}")]
    AccessDenied(ObjectLocation),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("{0}")]
    Other(String),
}
