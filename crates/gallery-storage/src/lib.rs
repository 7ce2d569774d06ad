pub mod cloudinary;

pub use cloudinary::{Cloudinary, CloudinaryConfig};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The provider answered, but refused or failed the operation.
    #[error("{0}")]
    Rejected(String),
    /// The provider could not be reached (includes timeouts).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// What the blob store hands back after a successful upload: a
/// retrievable URL and the opaque handle needed to delete the blob.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub src: String,
    pub public_id: String,
}

/// Seam in front of the external blob store. Handlers depend on this
/// trait so tests can swap in an in-memory double.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `folder` (the per-user namespace).
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<StoredBlob, StorageError>;

    /// Delete a previously uploaded blob by its deletion handle.
    /// Deleting an already-absent blob is not an error.
    async fn delete(&self, public_id: &str) -> Result<(), StorageError>;
}
