//! Clipvault Storage Library
//!
//! This crate provides the object-storage client used to list bucket
//! contents and upload recorded clips. It includes the `ObjectStore`
//! backend trait with S3 and local filesystem implementations, the
//! `StorageClient` that issues list/upload operations, and the transfer
//! engine that supervises one in-flight upload and reports progress and
//! terminal state to a caller-supplied observer.
//!
//! # Upload semantics
//!
//! Uploads run on a spawned task and never block the caller. A failed or
//! canceled upload is aborted at the backend so no partial object is ever
//! visible under the target key.

pub mod client;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
pub mod transfer;

// Re-export commonly used types
pub use client::StorageClient;
pub use clipvault_core::StorageBackend;
pub use factory::create_object_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3Store;
pub use traits::{CompletedPartRef, ListPage, ObjectStore, StorageError, StorageResult};
pub use transfer::{TransferHandle, TransferId, TransferObserver, TransferState};
