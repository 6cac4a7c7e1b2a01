use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::BufReader;
use tracing::debug;

use super::error::StorageError;
use super::media::MediaType;
use super::name::BlobName;
use super::traits::{BlobEntry, BlobStore, BoxReader};

/// Attempts at finding an unused name before giving up.
const MAX_NAME_ATTEMPTS: usize = 5;

/// Filesystem-backed blob store.
///
/// Blobs live flat in `{base_path}/{name}` so the directory can be served
/// as-is. Writes go to `{base_path}/.tmp` first and are published with a hard
/// link, which fails instead of replacing an existing file.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, name: &BlobName) -> PathBuf {
        self.base_path.join(name.as_str())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Publish a fully written temp file under a fresh name.
    async fn publish(&self, temp_path: &Path, media: &MediaType) -> Result<BlobName, StorageError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = BlobName::generate(&media.extension);
            match fs::hard_link(temp_path, self.blob_path(&name)).await {
                Ok(()) => return Ok(name),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(blob = %name, "Generated blob name already taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not find an unused blob name",
        )))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8], media: &MediaType) -> Result<BlobName, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let result = self.publish(&temp_path, media).await;
        let _ = fs::remove_file(&temp_path).await;
        result
    }

    async fn get_stream(&self, name: &BlobName) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(name)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &BlobName) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(name)).await?)
    }

    async fn delete(&self, name: &BlobName) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, name: &BlobName) -> Result<u64, StorageError> {
        match fs::metadata(self.blob_path(name)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Skips `.tmp` and anything this store did not write.
            let Ok(name) = BlobName::parse(&file_name) else {
                continue;
            };
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Deleted between read_dir and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !meta.is_file() {
                continue;
            }
            entries.push(BlobEntry {
                name,
                size: meta.len(),
                modified: DateTime::<Utc>::from(meta.modified()?),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
