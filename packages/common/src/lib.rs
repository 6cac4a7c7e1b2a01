pub mod storage;

pub use storage::{BlobName, BlobStore, MediaKind, MediaType, StorageError};
