//! Storage client
//!
//! `StorageClient` wraps an injected backend and issues the two operations
//! the application needs: listing every key in a bucket and uploading a
//! local file under a caller-chosen key. Authentication happens once, at
//! backend construction; the client is cheap to share.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clipvault_core::constants::{DEFAULT_MULTIPART_THRESHOLD_BYTES, DEFAULT_PART_SIZE_BYTES};

use crate::traits::{ObjectStore, StorageError, StorageResult};
use crate::transfer::{self, TransferHandle, TransferParams};

pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    part_size: usize,
    multipart_threshold: u64,
    next_transfer_id: AtomicU64,
}

impl StorageClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        StorageClient {
            store,
            part_size: DEFAULT_PART_SIZE_BYTES,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD_BYTES,
            next_transfer_id: AtomicU64::new(1),
        }
    }

    /// Create a client with explicit part sizing.
    ///
    /// `part_size` is the chunk size for multipart uploads; files at or
    /// below `multipart_threshold` upload with a single put instead.
    pub fn with_limits(
        store: Arc<dyn ObjectStore>,
        part_size: usize,
        multipart_threshold: u64,
    ) -> StorageResult<Self> {
        if part_size == 0 {
            return Err(StorageError::ConfigError(
                "part size must be non-zero".to_string(),
            ));
        }
        Ok(StorageClient {
            store,
            part_size,
            multipart_threshold,
            next_transfer_id: AtomicU64::new(1),
        })
    }

    /// List every object key in `bucket`, in store order.
    ///
    /// Pages are fetched until the store reports no continuation marker.
    /// The call is all-or-nothing: if any page request fails, the whole
    /// listing fails with `StoreUnavailable` and nothing already fetched is
    /// returned. An empty bucket yields an empty vector, not an error.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_keys(&self, bucket: &str) -> StorageResult<Vec<String>> {
        if bucket.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "bucket name must not be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .store
                .list_page(bucket, marker.as_deref())
                .await
                .map_err(|error| match error {
                    error @ StorageError::StoreUnavailable(_) => error,
                    other => StorageError::StoreUnavailable(other.to_string()),
                })?;

            keys.extend(page.keys);
            pages += 1;

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        tracing::info!(
            bucket = %bucket,
            key_count = keys.len(),
            pages = pages,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Bucket listing complete"
        );

        Ok(keys)
    }

    /// Begin uploading `local_file` to `bucket` under `key`.
    ///
    /// Validates synchronously that the file exists and is readable, then
    /// returns immediately with a `Pending` session; the transfer runs on a
    /// spawned task. Failures after this point are reported only through
    /// the session's observer. Must be called from within a tokio runtime.
    pub fn upload(
        &self,
        bucket: &str,
        key: &str,
        local_file: impl AsRef<Path>,
    ) -> StorageResult<TransferHandle> {
        let local_file = local_file.as_ref();

        if bucket.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "bucket name must not be empty".to_string(),
            ));
        }
        if key.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "object key must not be empty".to_string(),
            ));
        }

        let metadata = std::fs::metadata(local_file).map_err(|e| {
            StorageError::InvalidInput(format!(
                "local file {}: {}",
                local_file.display(),
                e
            ))
        })?;
        if !metadata.is_file() {
            return Err(StorageError::InvalidInput(format!(
                "local file {} is not a regular file",
                local_file.display()
            )));
        }
        // Fail fast on permissions rather than discovering them mid-transfer.
        std::fs::File::open(local_file).map_err(|e| {
            StorageError::InvalidInput(format!(
                "local file {} is not readable: {}",
                local_file.display(),
                e
            ))
        })?;

        let bytes_total = metadata.len();
        let id = self.next_transfer_id.fetch_add(1, Ordering::Relaxed);
        let (handle, shared) =
            TransferHandle::new(id, key.to_string(), local_file.to_path_buf(), bytes_total);

        let params = TransferParams {
            bucket: bucket.to_string(),
            content_type: content_type_for_key(key).to_string(),
            part_size: self.part_size,
            multipart_threshold: self.multipart_threshold,
        };

        tokio::spawn(transfer::run(shared, Arc::clone(&self.store), params));

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes_total,
            transfer_id = id,
            "Upload started"
        );

        Ok(handle)
    }
}

/// Content type by key extension; recorded clips are mp4.
fn content_type_for_key(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|ext| ext.to_str()) {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
