//! Screen image storage.
//!
//! Handlers talk to an [`ImageStorage`] trait object so the backend can be
//! swapped without touching request code. [`local::LocalImageStorage`]
//! writes to a directory that the router serves at `/files`.

pub mod local;

use async_trait::async_trait;
use axum::body::Bytes;

pub use local::LocalImageStorage;

/// Failure of a storage operation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key is empty, absolute, or escapes the storage root.
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// An object already exists under the key. Objects are never overwritten.
    #[error("Object '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Object storage for screen images, addressed by `{project_id}/{file}` keys.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store `bytes` under `key`. Fails if the key is already taken.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Remove the object under `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every object whose key starts with `prefix/`.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError>;

    /// Public URL at which the object under `key` can be read.
    fn public_url(&self, key: &str) -> String;

    /// Check that the backend is reachable and accepts writes.
    async fn health_check(&self) -> Result<(), StorageError>;
}
