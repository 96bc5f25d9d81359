//! Shared constants for upload sizing and listing.

/// S3 minimum part size for every part except the last.
pub const MIN_PART_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Default part size for multipart uploads.
pub const DEFAULT_PART_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Files at or below this size are uploaded with a single put.
pub const DEFAULT_MULTIPART_THRESHOLD_BYTES: u64 = 5 * 1024 * 1024;

/// Page size the local backend serves listings with (matches the S3 default).
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;
