//! S3ObjectStore - aws-sdk-s3 を使う本番用 ObjectStore
//!
//! endpoint を指定すると MinIO / localstack 向けに path-style でアクセスします。

use crate::config::StorageConfig;
use crate::domain::{ObjectLocation, StorageError};
use crate::ports::{ObjectBody, ObjectStore};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use futures::stream;

const ACCESS_DENIED: &str = "AccessDenied";

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// StorageConfig から client を構築
    ///
    /// region が未指定なら SDK のデフォルトチェーン（AWS_REGION, profile など）に任せます。
    pub async fn from_config(storage: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &storage.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &storage.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(storage.endpoint.is_some())
            .build();
        Self::new(Client::from_conf(s3_config))
    }
}

fn map_sdk_error(err: SdkError<GetObjectError>, location: &ObjectLocation) -> StorageError {
    if !matches!(err, SdkError::ServiceError(_)) {
        return StorageError::Transport(DisplayErrorContext(&err).to_string());
    }

    let service_err = err.into_service_error();
    if service_err.is_no_such_key() {
        StorageError::NotFound(location.clone())
    } else if service_err.code() == Some(ACCESS_DENIED) {
        StorageError::AccessDenied(location.clone())
    } else {
        StorageError::Other(DisplayErrorContext(&service_err).to_string())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectBody, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, location))?;

        let content_length = resp.content_length().and_then(|n| u64::try_from(n).ok());
        let chunks = stream::unfold(resp.body, |mut body| async move {
            body.next()
                .await
                .map(|chunk| (chunk.map_err(|e| StorageError::Transport(e.to_string())), body))
        });
        Ok(ObjectBody::new(chunks).with_content_length(content_length))
    }
}
