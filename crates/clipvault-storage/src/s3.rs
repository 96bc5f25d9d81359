use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;

use clipvault_core::StorageBackend;

use crate::traits::{CompletedPartRef, ListPage, ObjectStore, StorageError, StorageResult};

/// S3 storage implementation
///
/// Credentials come from the default provider chain at construction time;
/// the bucket is chosen per call.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Create a new S3Store instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider().into_iter().next() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            // Path-style addressing is required by MinIO and friends.
            s3_config_builder = s3_config_builder.force_path_style(true);

            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        Ok(S3Store { client })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, bucket: &str, marker: Option<&str>) -> StorageResult<ListPage> {
        let mut request = self.client.list_objects_v2().bucket(bucket);
        if let Some(marker) = marker {
            request = request.continuation_token(marker);
        }

        let output = request.send().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                "S3 list page failed"
            );
            StorageError::StoreUnavailable(e.to_string())
        })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect::<Vec<_>>();
        let next_marker = output.next_continuation_token().map(str::to_string);

        tracing::debug!(
            bucket = %bucket,
            key_count = keys.len(),
            truncated = next_marker.is_some(),
            "S3 list page"
        );

        Ok(ListPage { keys, next_marker })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let body = ByteStream::from(data);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    "S3 put failed"
                );
                StorageError::TransferFailed(e.to_string())
            })?;

        Ok(())
    }

    async fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let create_result = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "Failed to create multipart upload"
                );
                StorageError::TransferFailed(e.to_string())
            })?;

        let upload_id = create_result.upload_id().ok_or_else(|| {
            StorageError::TransferFailed("No upload ID returned from S3".to_string())
        })?;

        Ok(upload_id.to_string())
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StorageResult<CompletedPartRef> {
        let body = ByteStream::from(data);

        let upload_part_result = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    part_number = part_number,
                    "Failed to upload part"
                );
                StorageError::TransferFailed(e.to_string())
            })?;

        let etag = upload_part_result
            .e_tag()
            .ok_or_else(|| {
                StorageError::TransferFailed(format!(
                    "No ETag returned for part {}",
                    part_number
                ))
            })?
            .to_string();

        Ok(CompletedPartRef { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPartRef>,
    ) -> StorageResult<()> {
        let completed_parts = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.etag)
                    .build()
            })
            .collect::<Vec<_>>();

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(multipart_upload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "Failed to complete multipart upload"
                );
                StorageError::TransferFailed(e.to_string())
            })?;

        Ok(())
    }

    async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::TransferFailed(e.to_string()))?;

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
