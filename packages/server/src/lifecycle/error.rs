use common::{BlobName, StorageError};
use uuid::Uuid;

use crate::store::RecordStoreError;

/// Failures that abort a lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("sighting {0} not found")]
    NotFound(Uuid),
    #[error("{0}")]
    UnsupportedMediaKind(String),
    #[error("attachment exceeds size limit ({actual} > {limit} bytes)")]
    PayloadTooLarge { actual: u64, limit: u64 },
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("failed to write attachment: {0}")]
    BlobWrite(String),
}

impl From<RecordStoreError> for LifecycleError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::NotFound(id) => Self::NotFound(id),
            RecordStoreError::Unavailable(e) => Self::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { actual, limit } => {
                Self::PayloadTooLarge { actual, limit }
            }
            StorageError::UnsupportedMediaKind(_) => Self::UnsupportedMediaKind(err.to_string()),
            other => Self::BlobWrite(other.to_string()),
        }
    }
}

/// Non-fatal problems. They never fail the request but are always logged and
/// handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleWarning {
    /// Blobs were written but the record creation failed; they are orphans
    /// until the sweep collects them.
    PartialCreateFailure { orphaned: Vec<BlobName> },
    /// New blobs were written but the record update failed.
    PartialUpdateFailure { orphaned: Vec<BlobName> },
    /// A blob no longer referenced by any record could not be removed.
    BlobDeleteFailure { blob: BlobName, reason: String },
}
