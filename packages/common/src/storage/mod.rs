mod error;
mod media;
mod name;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use media::{MediaKind, MediaType};
pub use name::BlobName;
pub use traits::{BlobEntry, BlobStore, BoxReader};
