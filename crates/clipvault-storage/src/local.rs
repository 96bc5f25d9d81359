use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use clipvault_core::constants::DEFAULT_LIST_PAGE_SIZE;
use clipvault_core::StorageBackend;

use crate::traits::{CompletedPartRef, ListPage, ObjectStore, StorageError, StorageResult};

const MULTIPART_DIR: &str = ".multipart";
const TMP_DIR: &str = ".tmp";

/// Local filesystem storage implementation
///
/// Objects live under `{base_path}/{bucket}/{key}`. Multipart uploads are
/// staged outside the bucket directory and renamed into place on complete,
/// so a listing never observes a partially written object.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    page_size: usize,
}

impl LocalStore {
    /// Create a new LocalStore rooted at `base_path`.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            base_path,
            page_size: DEFAULT_LIST_PAGE_SIZE,
        })
    }

    /// Override the listing page size (tests exercise pagination with tiny
    /// pages).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn validate_bucket(bucket: &str) -> StorageResult<()> {
        if bucket.is_empty() || bucket.contains('/') || bucket.starts_with('.') {
            return Err(StorageError::InvalidInput(format!(
                "invalid bucket name: {:?}",
                bucket
            )));
        }
        Ok(())
    }

    /// Convert bucket and key to a filesystem path, rejecting keys that
    /// could escape the bucket directory.
    fn key_to_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        Self::validate_bucket(bucket)?;
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidInput(format!(
                "invalid object key: {:?}",
                key
            )));
        }
        Ok(self.base_path.join(bucket).join(key))
    }

    fn staging_dir(&self, upload_id: &str) -> PathBuf {
        self.base_path.join(MULTIPART_DIR).join(upload_id)
    }

    async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write `data` to a temp file and rename it to `path` so the object
    /// appears atomically.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let tmp_dir = self.base_path.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).await?;
        let tmp_path = tmp_dir.join(Uuid::new_v4().to_string());

        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to create file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to write file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to sync file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        Self::ensure_parent_dir(path).await?;
        fs::rename(&tmp_path, path).await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to publish file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Collect every key in the bucket, sorted, '/'-separated relative to
    /// the bucket directory. A missing bucket directory is an empty bucket.
    async fn collect_keys(&self, bucket: &str) -> StorageResult<Vec<String>> {
        Self::validate_bucket(bucket)?;
        let bucket_dir = self.base_path.join(bucket);

        if !fs::try_exists(&bucket_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut stack = vec![bucket_dir.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| {
                StorageError::StoreUnavailable(format!(
                    "Failed to read directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::StoreUnavailable(format!(
                    "Failed to read directory {}: {}",
                    dir.display(),
                    e
                ))
            })? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| {
                    StorageError::StoreUnavailable(format!(
                        "Failed to stat {}: {}",
                        path.display(),
                        e
                    ))
                })?;

                if file_type.is_dir() {
                    stack.push(path);
                } else if let Ok(relative) = path.strip_prefix(&bucket_dir) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list_page(&self, bucket: &str, marker: Option<&str>) -> StorageResult<ListPage> {
        let all_keys = self.collect_keys(bucket).await?;

        let page: Vec<String> = all_keys
            .iter()
            .filter(|key| marker.map_or(true, |m| key.as_str() > m))
            .take(self.page_size)
            .cloned()
            .collect();

        let next_marker = match page.last() {
            Some(last) if all_keys.iter().any(|key| key.as_str() > last.as_str()) => {
                Some(last.clone())
            }
            _ => None,
        };

        Ok(ListPage {
            keys: page,
            next_marker,
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        let path = self.key_to_path(bucket, key)?;
        self.write_atomic(&path, &data).await?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = data.len(),
            "Local store put"
        );

        Ok(())
    }

    async fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<String> {
        // Validate up front so a bad key fails before any part is written.
        self.key_to_path(bucket, key)?;

        let upload_id = Uuid::new_v4().to_string();
        let staging = self.staging_dir(&upload_id);
        fs::create_dir_all(&staging).await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to create staging directory {}: {}",
                staging.display(),
                e
            ))
        })?;

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StorageResult<CompletedPartRef> {
        self.key_to_path(bucket, key)?;

        let staging = self.staging_dir(upload_id);
        if !fs::try_exists(&staging).await.unwrap_or(false) {
            return Err(StorageError::TransferFailed(format!(
                "unknown upload id: {}",
                upload_id
            )));
        }

        let part_path = staging.join(format!("part-{:05}", part_number));
        fs::write(&part_path, &data).await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to write part {}: {}",
                part_path.display(),
                e
            ))
        })?;

        Ok(CompletedPartRef {
            part_number,
            etag: format!("local-{}", part_number),
        })
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPartRef>,
    ) -> StorageResult<()> {
        let path = self.key_to_path(bucket, key)?;
        let staging = self.staging_dir(upload_id);

        if !fs::try_exists(&staging).await.unwrap_or(false) {
            return Err(StorageError::TransferFailed(format!(
                "unknown upload id: {}",
                upload_id
            )));
        }

        let mut data = Vec::new();
        for part in &parts {
            let part_path = staging.join(format!("part-{:05}", part.part_number));
            let bytes = fs::read(&part_path).await.map_err(|e| {
                StorageError::TransferFailed(format!(
                    "Missing part {} for upload {}: {}",
                    part.part_number, upload_id, e
                ))
            })?;
            data.extend_from_slice(&bytes);
        }

        self.write_atomic(&path, &data).await?;
        let _ = fs::remove_dir_all(&staging).await;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            parts = parts.len(),
            size_bytes = data.len(),
            "Local store multipart complete"
        );

        Ok(())
    }

    async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        self.key_to_path(bucket, key)?;

        let staging = self.staging_dir(upload_id);
        if fs::try_exists(&staging).await.unwrap_or(false) {
            fs::remove_dir_all(&staging).await.map_err(|e| {
                StorageError::TransferFailed(format!(
                    "Failed to remove staging directory {}: {}",
                    staging.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
