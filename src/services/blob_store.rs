//! Object storage seam.
//!
//! The orchestration layer only talks to [`BlobStore`]; concrete backends
//! live in [`crate::services::cloud_store`] (S3 through `object_store`) and
//! [`crate::services::local_store`] (disk + SQLite).

use crate::models::stored::StoredObject;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    ObjectStore(#[from] object_store::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Flat key/value blob storage within a single configured namespace.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` under `key` as a single atomic put.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()>;

    /// Every object in the namespace, sorted by key.
    ///
    /// Backends that paginate must exhaust pagination before returning.
    async fn list(&self) -> StorageResult<Vec<StoredObject>>;

    /// Full payload of `key`.
    ///
    /// Returns `StorageError::NotFound` if the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Short label for diagnostics, e.g. `s3` or `local`.
    fn backend(&self) -> &'static str;
}
