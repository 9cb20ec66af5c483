//! CardFetcher - cards ドキュメントをバイト列として取得
//!
//! # 学習ポイント
//! - trait object（Arc<dyn ObjectStore>）による差し替え
//! - tokio::select! + CancellationToken による中断
//! - drop によるストリームの確実な解放

use crate::config::CardsConfig;
use crate::domain::{CardBytes, StorageError};
use crate::ports::ObjectStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// CardFetcher は設定された bucket/key から cards を取得する
///
/// # 保証
/// - 成功時は object の全バイトを無加工で返す
/// - 失敗時は ObjectStore が返したエラーをそのまま返す（リトライ・分類なし）
/// - どの経路でも ObjectBody は関数から戻る前に drop される
///
/// # 使用例
/// ```ignore
/// let fetcher = CardFetcher::new(store, CardsConfig::new("rewards", "cards.json"));
/// let cards = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await?;
/// ```
#[derive(Clone)]
pub struct CardFetcher {
    store: Arc<dyn ObjectStore>,
    cards: CardsConfig,
}

impl CardFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, cards: CardsConfig) -> Self {
        Self { store, cards }
    }

    pub fn cards_config(&self) -> &CardsConfig {
        &self.cards
    }

    /// cards ドキュメントを取得して生バイト列を返す
    ///
    /// # エラー
    /// - get_object / 読み込みのエラーはそのまま
    /// - `cancel` が発火したら StorageError::Cancelled
    /// - fetch_timeout を超えたら StorageError::DeadlineExceeded
    #[tracing::instrument(
        name = "fetch_cards",
        skip_all,
        fields(bucket = %self.cards.bucket, key = %self.cards.key)
    )]
    pub async fn fetch_cards_as_bytes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CardBytes, StorageError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StorageError::Cancelled),
            result = self.fetch_with_deadline() => result,
        };

        match &result {
            Ok(cards) => tracing::debug!(bytes = cards.len(), "fetched cards"),
            Err(err) => tracing::warn!(error = %err, "failed to fetch cards"),
        }
        result
    }

    async fn fetch_with_deadline(&self) -> Result<CardBytes, StorageError> {
        match self.cards.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.fetch())
                .await
                .map_err(|_| StorageError::DeadlineExceeded(timeout))?,
            None => self.fetch().await,
        }
    }

    async fn fetch(&self) -> Result<CardBytes, StorageError> {
        let body = self.store.get_object(&self.cards.location()).await?;
        let bytes = body.collect().await?;
        Ok(CardBytes::from(bytes))
    }
}

impl std::fmt::Debug for CardFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardFetcher")
            .field("cards", &self.cards)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectLocation;
    use crate::impls::InMemoryObjectStore;
    use crate::ports::ObjectBody;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::time::Duration;

    const CARDS: &str = r#"{ "card": [{"title": "<string>", "description": "<string>", "url": "<string>", "thumbnail": "<string>"}] }"#;

    type GetObjectFn =
        Box<dyn Fn(&ObjectLocation) -> Result<ObjectBody, StorageError> + Send + Sync>;

    /// get_object の振る舞いをクロージャで差し替えるモック（未設定なら空ボディ）
    #[derive(Default)]
    struct MockObjectStore {
        fn_get_object: Option<GetObjectFn>,
    }

    #[async_trait]
    impl ObjectStore for MockObjectStore {
        async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectBody, StorageError> {
            match &self.fn_get_object {
                Some(f) => f(location),
                None => Ok(ObjectBody::empty()),
            }
        }
    }

    fn cards_config() -> CardsConfig {
        CardsConfig::new("rewards", "cards.json")
    }

    fn mock_fetcher(f: GetObjectFn) -> CardFetcher {
        let store = MockObjectStore {
            fn_get_object: Some(f),
        };
        CardFetcher::new(Arc::new(store), cards_config())
    }

    fn inmem_fetcher(store: &Arc<InMemoryObjectStore>, cards: CardsConfig) -> CardFetcher {
        CardFetcher::new(store.clone(), cards)
    }

    #[tokio::test]
    async fn test_error_get_object() {
        let fetcher = mock_fetcher(Box::new(|_: &ObjectLocation| {
            Err(StorageError::Other("error".into()))
        }));

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Err(StorageError::Other("error".into())));
    }

    #[tokio::test]
    async fn test_success() {
        let fetcher = mock_fetcher(Box::new(|_: &ObjectLocation| {
            Ok(ObjectBody::from_bytes(CARDS))
        }));

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Ok(CardBytes::from(CARDS)));
    }

    #[tokio::test]
    async fn test_default_mock_returns_empty_cards() {
        let fetcher = CardFetcher::new(Arc::new(MockObjectStore::default()), cards_config());
        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;
        assert_eq!(actual, Ok(CardBytes::default()));
    }

    #[tokio::test]
    async fn test_passes_configured_location_to_store() {
        let fetcher = mock_fetcher(Box::new(|location: &ObjectLocation| {
            assert_eq!(location, &ObjectLocation::new("rewards", "cards.json"));
            Ok(ObjectBody::empty())
        }));
        fetcher
            .fetch_cards_as_bytes(&CancellationToken::new())
            .await
            .unwrap();
    }

    #[rstest]
    #[case::not_found(StorageError::NotFound(ObjectLocation::new("rewards", "cards.json")))]
    #[case::access_denied(StorageError::AccessDenied(ObjectLocation::new("rewards", "cards.json")))]
    #[case::transport(StorageError::Transport("dns failure".into()))]
    #[case::other(StorageError::Other("error".into()))]
    #[tokio::test]
    async fn test_open_error_is_passed_through(#[case] injected: StorageError) {
        let store = Arc::new(InMemoryObjectStore::new());
        store.fail_with(cards_config().location(), injected.clone());
        let fetcher = inmem_fetcher(&store, cards_config());

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Err(injected));
        assert_eq!(store.open_count(), 0);
        assert_eq!(store.close_count(), 0);
    }

    #[rstest]
    #[case::empty("", 4)]
    #[case::single_chunk(CARDS, 4096)]
    #[case::many_chunks(CARDS, 7)]
    #[case::byte_by_byte(CARDS, 1)]
    #[tokio::test]
    async fn test_returns_exact_bytes_and_closes_body(
        #[case] data: &'static str,
        #[case] chunk_size: usize,
    ) {
        let store = Arc::new(InMemoryObjectStore::new().with_chunk_size(chunk_size));
        store.put(cards_config().location(), data);
        let fetcher = inmem_fetcher(&store, cards_config());

        let actual = fetcher
            .fetch_cards_as_bytes(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(actual.as_bytes(), data.as_bytes());
        assert_eq!(store.open_count(), 1);
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_fetches_return_same_bytes() {
        let store = Arc::new(InMemoryObjectStore::new().with_chunk_size(16));
        store.put(cards_config().location(), CARDS);
        let fetcher = inmem_fetcher(&store, cards_config());
        let cancel = CancellationToken::new();

        let first = fetcher.fetch_cards_as_bytes(&cancel).await.unwrap();
        let second = fetcher.fetch_cards_as_bytes(&cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.close_count(), 2);
    }

    #[tokio::test]
    async fn test_read_error_is_passed_through_and_body_closed() {
        let store = Arc::new(InMemoryObjectStore::new().with_chunk_size(8));
        store.put(cards_config().location(), CARDS);
        store.fail_read_with(
            cards_config().location(),
            StorageError::Transport("connection reset".into()),
        );
        let fetcher = inmem_fetcher(&store, cards_config());

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Err(StorageError::Transport("connection reset".into())));
        assert_eq!(store.open_count(), 1);
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_stalled_read() {
        let store = Arc::new(InMemoryObjectStore::new().with_chunk_size(8));
        store.put(cards_config().location(), CARDS);
        store.stall_read(cards_config().location());
        let fetcher = inmem_fetcher(&store, cards_config());
        let cancel = CancellationToken::new();

        let canceller = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            }
        });

        let actual = fetcher.fetch_cards_as_bytes(&cancel).await;
        canceller.await.unwrap();

        assert_eq!(actual, Err(StorageError::Cancelled));
        assert_eq!(store.open_count(), 1);
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_stalled_open() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put(cards_config().location(), CARDS);
        store.stall_open(cards_config().location());
        let fetcher = inmem_fetcher(&store, cards_config());
        let cancel = CancellationToken::new();

        let canceller = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            }
        });

        let actual = fetcher.fetch_cards_as_bytes(&cancel).await;
        canceller.await.unwrap();

        assert_eq!(actual, Err(StorageError::Cancelled));
        assert_eq!(store.open_count(), 0);
        assert_eq!(store.close_count(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_open() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put(cards_config().location(), CARDS);
        let fetcher = inmem_fetcher(&store, cards_config());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let actual = fetcher.fetch_cards_as_bytes(&cancel).await;

        assert_eq!(actual, Err(StorageError::Cancelled));
        assert_eq!(store.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_during_stalled_read() {
        let timeout = Duration::from_secs(3);
        let store = Arc::new(InMemoryObjectStore::new().with_chunk_size(8));
        store.put(cards_config().location(), CARDS);
        store.stall_read(cards_config().location());
        let fetcher = inmem_fetcher(&store, cards_config().with_fetch_timeout(timeout));

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Err(StorageError::DeadlineExceeded(timeout)));
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_during_stalled_open() {
        let timeout = Duration::from_secs(3);
        let store = Arc::new(InMemoryObjectStore::new());
        store.put(cards_config().location(), CARDS);
        store.stall_open(cards_config().location());
        let fetcher = inmem_fetcher(&store, cards_config().with_fetch_timeout(timeout));

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Err(StorageError::DeadlineExceeded(timeout)));
        assert_eq!(store.open_count(), 0);
        assert_eq!(store.close_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_not_hit_by_fast_fetch() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put(cards_config().location(), CARDS);
        let fetcher = inmem_fetcher(
            &store,
            cards_config().with_fetch_timeout(Duration::from_millis(10)),
        );

        let actual = fetcher.fetch_cards_as_bytes(&CancellationToken::new()).await;

        assert_eq!(actual, Ok(CardBytes::from(CARDS)));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_fetcher() {
        let store = Arc::new(InMemoryObjectStore::new().with_chunk_size(5));
        store.put(cards_config().location(), CARDS);
        let fetcher = Arc::new(inmem_fetcher(&store, cards_config()));
        let cancel = CancellationToken::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let fetcher = fetcher.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { fetcher.fetch_cards_as_bytes(&cancel).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(CardBytes::from(CARDS)));
        }
        assert_eq!(store.open_count(), 8);
        assert_eq!(store.close_count(), 8);
    }
}
