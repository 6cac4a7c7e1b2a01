use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::media::MediaType;
use super::name::BlobName;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// A blob as seen by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub name: BlobName,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Storage for immutable, uniquely named media blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a freshly generated name and return it.
    ///
    /// Never overwrites an existing blob. Readers observe either nothing or
    /// the complete content.
    async fn put(&self, data: &[u8], media: &MediaType) -> Result<BlobName, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, name: &BlobName) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(name).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, name: &BlobName) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, name: &BlobName) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    /// A missing blob is not an error.
    async fn delete(&self, name: &BlobName) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, name: &BlobName) -> Result<u64, StorageError>;

    /// List every stored blob.
    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError>;
}
