//! Backend abstraction trait
//!
//! This module defines the `ObjectStore` trait that all storage backends must
//! implement, along with the error taxonomy shared by the client and the
//! transfer engine.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use clipvault_core::StorageBackend;

/// Storage operation errors
///
/// `InvalidInput` and `StoreUnavailable` are surfaced synchronously to the
/// caller; `TransferFailed` is delivered through a session's error callback
/// and never thrown into the caller's stack.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One page of a bucket listing.
///
/// `next_marker` is the opaque continuation marker; `None` means the store
/// has no further results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_marker: Option<String>,
}

/// Reference to a successfully uploaded part, needed to complete a
/// multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartRef {
    pub part_number: i32,
    pub etag: String,
}

/// Backend abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// The client and transfer engine drive pagination and multipart chunking
/// through these operations without coupling to any vendor SDK.
///
/// Multipart contract: after `create_multipart`, either `complete_multipart`
/// or `abort_multipart` must be called; until `complete_multipart` returns,
/// no object is visible under the key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of object keys, in store order.
    ///
    /// `marker` is the continuation marker from the previous page, or `None`
    /// for the first page. An empty bucket yields an empty page, not an
    /// error.
    async fn list_page(&self, bucket: &str, marker: Option<&str>) -> StorageResult<ListPage>;

    /// Store a small object in a single request.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<()>;

    /// Begin a multipart upload, returning the upload id.
    async fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Upload one part. Part numbers start at 1 and are contiguous.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StorageResult<CompletedPartRef>;

    /// Complete a multipart upload; the object becomes visible under `key`.
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPartRef>,
    ) -> StorageResult<()>;

    /// Abort a multipart upload, discarding all uploaded parts.
    async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
