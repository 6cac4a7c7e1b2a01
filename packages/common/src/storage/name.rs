use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Longest name [`BlobName::parse`] accepts.
const MAX_NAME_LEN: usize = 128;

/// The generated, collision-resistant name of a stored blob.
///
/// Generated names look like `{unix micros}-{9 random digits}.{ext}`. The
/// extension is kept so content types can be inferred when the blob is served.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobName(String);

impl BlobName {
    /// Generate a fresh name carrying `extension`.
    pub fn generate(extension: &str) -> Self {
        let micros = Utc::now().timestamp_micros();
        let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
        Self(format!("{micros}-{suffix:09}.{extension}"))
    }

    /// Parse a name received from outside the store (a stored record, a URL).
    ///
    /// Only flat names made of `[A-Za-z0-9._-]` are accepted, so a parsed name
    /// can never address anything outside the blob directory.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.is_empty() {
            return Err(StorageError::InvalidName("name cannot be empty".into()));
        }
        if s.len() > MAX_NAME_LEN {
            return Err(StorageError::InvalidName(format!(
                "name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if s.starts_with('.') {
            return Err(StorageError::InvalidName(
                "name must not start with '.'".into(),
            ));
        }
        if s.contains("..") {
            return Err(StorageError::InvalidName("name must not contain '..'".into()));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(StorageError::InvalidName(format!(
                "'{s}' contains invalid characters"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The extension the name was generated with, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// MIME type inferred from the extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.0)
            .first_or_octet_stream()
            .to_string()
    }
}

impl fmt::Debug for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobName({})", self.0)
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for BlobName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
