use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

const MAX_EXTENSION_LEN: usize = 10;
const FALLBACK_EXTENSION: &str = "bin";

/// The content categories the blob store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Classify a declared content type (`image/*` or `audio/*`).
    pub fn from_content_type(content_type: &str) -> Result<Self, StorageError> {
        let essence = essence(content_type);
        match essence.split_once('/') {
            Some(("image", sub)) if !sub.is_empty() => Ok(Self::Image),
            Some(("audio", sub)) if !sub.is_empty() => Ok(Self::Audio),
            _ => Err(StorageError::UnsupportedMediaKind(content_type.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated upload description: its category and the extension its blob
/// name will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: MediaKind,
    pub extension: String,
}

impl MediaType {
    /// Validate a declared content type and derive the blob extension.
    ///
    /// The extension comes from the original filename when it is sane and
    /// maps to the same kind, otherwise from the content type, otherwise
    /// `bin`. Blobs are served with the type their extension implies, so an
    /// image upload can never end up named `.html`.
    pub fn from_upload(content_type: &str, file_name: Option<&str>) -> Result<Self, StorageError> {
        let kind = MediaKind::from_content_type(content_type)?;
        let extension = file_name
            .and_then(|name| extension_from_file_name(name, kind))
            .or_else(|| extension_from_content_type(content_type))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        Ok(Self { kind, extension })
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn sanitize_extension(ext: &str) -> Option<String> {
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn extension_from_file_name(file_name: &str, kind: MediaKind) -> Option<String> {
    let ext = sanitize_extension(Path::new(file_name).extension()?.to_str()?)?;
    let implied = mime_guess::from_ext(&ext).first()?;
    MediaKind::from_content_type(implied.essence_str())
        .is_ok_and(|k| k == kind)
        .then_some(ext)
}

fn extension_from_content_type(content_type: &str) -> Option<String> {
    let exts = mime_guess::get_mime_extensions_str(&essence(content_type))?;
    exts.iter().find_map(|ext| sanitize_extension(ext))
}
