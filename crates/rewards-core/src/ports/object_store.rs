//! ObjectStore port - Blob ストレージ（S3/MinIO/Local/InMemory）
//!
//! ObjectStore は bucket/key で指定された object を読み出すだけの capability です。
//! 呼び出し間で状態を持たず、成功時は ObjectBody（閉じられるバイトストリーム）を返します。

use crate::domain::{ObjectLocation, StorageError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// content_length を信用して確保する上限
const MAX_PREALLOC: usize = 8 * 1024 * 1024;

/// ObjectStore は object を取得するためのポート
///
/// # 使用例
/// ```ignore
/// let body = store.get_object(&ObjectLocation::new("rewards", "cards.json")).await?;
/// let bytes = body.collect().await?;
/// ```
///
/// # 実装のルール
/// - ネイティブのエラーは StorageError に変換して返す
/// - ObjectBody の drop で下層のリソース（socket, file handle）を解放する
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectBody, StorageError>;
}

/// ObjectBody は get_object が返す読み出し用ストリーム
///
/// drop が close に相当します。
pub struct ObjectBody {
    inner: BoxStream<'static, Result<Bytes, StorageError>>,
    content_length: Option<u64>,
}

impl ObjectBody {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StorageError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            content_length: None,
        }
    }

    /// 1 チャンクだけのボディ
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self::new(stream::iter([Ok(bytes)])).with_content_length(Some(len))
    }

    pub fn empty() -> Self {
        Self::new(stream::empty()).with_content_length(Some(0))
    }

    pub fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    /// バックエンドが申告したサイズ（未知なら None）
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, StorageError>> {
        self.inner.next().await
    }

    /// ストリームを最後まで読み、全バイトを返す
    ///
    /// # エラー
    /// - 途中のチャンクがエラーならそのまま返す（読めた分は捨てる）
    ///
    /// チャンクが 1 つだけならコピーせずにそのまま返します。
    pub async fn collect(mut self) -> Result<Bytes, StorageError> {
        let first = match self.inner.next().await {
            Some(chunk) => chunk?,
            None => return Ok(Bytes::new()),
        };
        let second = match self.inner.next().await {
            Some(chunk) => chunk?,
            None => return Ok(first),
        };

        let hint = self
            .content_length
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
            .min(MAX_PREALLOC);
        let mut buf = BytesMut::with_capacity(hint.max(first.len() + second.len()));
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for ObjectBody {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
