use std::fmt;

/// Failures of the attachment blob store.
#[derive(Debug)]
pub enum StorageError {
    /// No blob with this name exists. Carries the blob name.
    NotFound(String),
    /// The blob directory could not be read or written.
    Io(std::io::Error),
    /// The name is not of the `{micros}-{digits}.{ext}` form this store
    /// generates, e.g. it contains a path separator. Carries the reason.
    InvalidName(String),
    /// The attachment is larger than `max_blob_size`.
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// The declared content type is neither `image/*` nor `audio/*`, or is of
    /// the wrong kind for its slot. Carries the declared type.
    UnsupportedMediaKind(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "attachment not found: {name}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidName(reason) => write!(f, "invalid attachment name: {reason}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "attachment exceeds size limit ({actual} > {limit} bytes)")
            }
            Self::UnsupportedMediaKind(content_type) => {
                write!(
                    f,
                    "unsupported media type '{content_type}': only images and audio are accepted"
                )
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
