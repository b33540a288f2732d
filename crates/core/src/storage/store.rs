//! File store port.

use std::future::Future;

use bytes::Bytes;

use super::error::StorageError;

/// Non-transactional store holding attachment bytes.
///
/// Paths are unique per write, so implementations never need locking or
/// update-in-place semantics.
pub trait FileStore: Send + Sync {
    /// Write `bytes` under `path`.
    fn write(
        &self,
        path: &str,
        bytes: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete the file at `path`. A missing path is not an error.
    fn delete(&self, path: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Check whether a file exists at `path`.
    fn exists(&self, path: &str) -> impl Future<Output = bool> + Send;

    /// Resolve a URL for the file at `path`.
    fn url(&self, path: &str) -> impl Future<Output = Result<String, StorageError>> + Send;
}
