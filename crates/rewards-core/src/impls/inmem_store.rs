//! InMemoryObjectStore - 開発用・テスト用の ObjectStore
//!
//! # 学習ポイント
//! - Drop による close の観測（TrackedStream）
//! - 障害注入（open の失敗・停止 / 読み込み途中の失敗・停止）
//! - Bytes::slice によるゼロコピーのチャンク分割

use crate::domain::{ObjectLocation, StorageError};
use crate::ports::{ObjectBody, ObjectStore};
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// get_object 自体の振る舞い
#[derive(Debug, Clone)]
enum OpenFault {
    Fail(StorageError),
    Stall,
}

/// 最初のチャンクを返した後の振る舞い
#[derive(Debug, Clone)]
enum ReadFault {
    Fail(StorageError),
    Stall,
}

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    read_fault: Option<ReadFault>,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectLocation, Entry>,
    open_faults: HashMap<ObjectLocation, OpenFault>,
}

/// InMemoryObjectStore は HashMap に object を保持する ObjectStore
///
/// # 実装詳細
/// - HashMap<ObjectLocation, Entry> を Mutex で保護
/// - get_object ごとに open_count を加算
/// - 返した ObjectBody が drop されると close_count を加算
///
/// # 使用例
/// ```ignore
/// let store = InMemoryObjectStore::new();
/// store.put(ObjectLocation::new("rewards", "cards.json"), r#"{"card":[]}"#);
/// let body = store.get_object(&ObjectLocation::new("rewards", "cards.json")).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
    chunk_size: usize,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            chunk_size: DEFAULT_CHUNK_SIZE,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// ボディを `chunk_size` バイトずつに分割して返す（0 は 1 として扱う）
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// object を登録（既存なら上書きし、注入済みの障害も消す）
    pub fn put(&self, location: ObjectLocation, data: impl Into<Bytes>) {
        let mut state = self.state();
        state.open_faults.remove(&location);
        state.objects.insert(
            location,
            Entry {
                data: data.into(),
                read_fault: None,
            },
        );
    }

    /// get_object 自体を `err` で失敗させる
    pub fn fail_with(&self, location: ObjectLocation, err: StorageError) {
        self.state().open_faults.insert(location, OpenFault::Fail(err));
    }

    /// get_object を永久に返さない（ボディは開かれない）
    pub fn stall_open(&self, location: ObjectLocation) {
        self.state().open_faults.insert(location, OpenFault::Stall);
    }

    /// 最初のチャンクの後に `err` を返す
    ///
    /// object が未登録なら空の object として登録します。
    pub fn fail_read_with(&self, location: ObjectLocation, err: StorageError) {
        self.set_read_fault(location, ReadFault::Fail(err));
    }

    /// 最初のチャンクの後、ストリームを永久に止める
    pub fn stall_read(&self, location: ObjectLocation) {
        self.set_read_fault(location, ReadFault::Stall);
    }

    /// get_object が成功した回数
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// drop された ObjectBody の数
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn set_read_fault(&self, location: ObjectLocation, fault: ReadFault) {
        let mut state = self.state();
        let entry = state.objects.entry(location).or_insert_with(|| Entry {
            data: Bytes::new(),
            read_fault: None,
        });
        entry.read_fault = Some(fault);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn split(&self, data: &Bytes) -> Vec<Bytes> {
        (0..data.len())
            .step_by(self.chunk_size)
            .map(|start| data.slice(start..(start + self.chunk_size).min(data.len())))
            .collect()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectBody, StorageError> {
        let entry = {
            let state = self.state();
            match state.open_faults.get(location) {
                Some(OpenFault::Fail(err)) => return Err(err.clone()),
                Some(OpenFault::Stall) => None,
                None => Some(
                    state
                        .objects
                        .get(location)
                        .cloned()
                        .ok_or_else(|| StorageError::NotFound(location.clone()))?,
                ),
            }
        };
        let Some(entry) = entry else {
            return std::future::pending().await;
        };

        let content_length = entry.data.len() as u64;
        let mut chunks = self.split(&entry.data).into_iter();

        let inner: BoxStream<'static, Result<Bytes, StorageError>> = match entry.read_fault {
            None => stream::iter(chunks.map(Ok)).boxed(),
            Some(ReadFault::Fail(err)) => stream::iter(chunks.next().map(Ok))
                .chain(stream::iter([Err(err)]))
                .boxed(),
            Some(ReadFault::Stall) => stream::iter(chunks.next().map(Ok))
                .chain(stream::pending())
                .boxed(),
        };

        self.opened.fetch_add(1, Ordering::SeqCst);
        let tracked = TrackedStream {
            inner,
            closed: self.closed.clone(),
        };
        Ok(ObjectBody::new(tracked).with_content_length(Some(content_length)))
    }
}

/// drop 時に close_count を加算するストリーム
struct TrackedStream {
    inner: BoxStream<'static, Result<Bytes, StorageError>>,
    closed: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
