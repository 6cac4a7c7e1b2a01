//! Attachment lifecycle coordination.
//!
//! The record store and the blob store share no transaction, so every
//! mutation orders its steps such that a record never references a missing
//! blob. The only tolerated inconsistency is an orphaned blob, which the
//! sweep in [`crate::sweep`] eventually removes.

mod error;
mod locks;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BlobName, BlobStore, MediaKind, MediaType};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::sighting;
use crate::store::{RecordStore, RecordStoreError, RefUpdate, SightingMetadata};

pub use error::{LifecycleError, LifecycleWarning};
pub use locks::{MutationGuard, MutationLocks};

/// One of the two attachments a record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Photo,
    Audio,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Audio => "audio",
        }
    }

    pub fn expected_kind(&self) -> MediaKind {
        match self {
            Self::Photo => MediaKind::Image,
            Self::Audio => MediaKind::Audio,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attachment bytes received with a request.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub data: Vec<u8>,
    pub media: MediaType,
}

/// What an update request asks for one slot.
#[derive(Debug, Clone, Default)]
pub enum SlotChange {
    /// Leave the current reference untouched.
    #[default]
    Keep,
    /// Store new bytes and point the slot at them.
    Replace(AttachmentUpload),
    /// Drop the attachment.
    Clear,
}

/// A successful mutation together with the non-fatal problems it hit.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub warnings: Vec<LifecycleWarning>,
}

/// Coordinates the record store and the blob store.
pub struct SightingService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    locks: MutationLocks,
}

impl SightingService {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            records,
            blobs,
            locks: MutationLocks::new(),
        }
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub async fn list(&self) -> Result<Vec<sighting::Model>, LifecycleError> {
        Ok(self.records.list().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<sighting::Model, LifecycleError> {
        Ok(self.records.get(id).await?)
    }

    /// Store the attachments, then create the record referencing them.
    pub async fn create(
        &self,
        metadata: SightingMetadata,
        observed_at: Option<DateTime<Utc>>,
        photo: Option<AttachmentUpload>,
        audio: Option<AttachmentUpload>,
    ) -> Result<sighting::Model, LifecycleError> {
        let uploads: Vec<_> = [(Slot::Photo, photo.as_ref()), (Slot::Audio, audio.as_ref())]
            .into_iter()
            .filter_map(|(slot, upload)| upload.map(|u| (slot, u)))
            .collect();
        check_slots(&uploads)?;

        let written = self.put_uploads(&uploads).await?;
        let photo_name = written_for(&written, Slot::Photo);
        let audio_name = written_for(&written, Slot::Audio);

        match self
            .records
            .create(metadata, observed_at, photo_name, audio_name)
            .await
        {
            Ok(created) => {
                info!(sighting_id = %created.id, attachments = written.len(), "Sighting created");
                Ok(created)
            }
            Err(e) => {
                // The insert may have committed before the error surfaced, so
                // the new blobs are left for the sweep instead of deleted.
                let orphaned: Vec<_> = written.into_iter().map(|(_, name)| name).collect();
                if !orphaned.is_empty() {
                    report(&LifecycleWarning::PartialCreateFailure { orphaned }, None);
                }
                Err(e.into())
            }
        }
    }

    /// Replace metadata and apply per-slot attachment changes.
    ///
    /// New blobs are written before the record update; superseded blobs are
    /// deleted only after it committed.
    pub async fn update(
        &self,
        id: Uuid,
        metadata: SightingMetadata,
        photo: SlotChange,
        audio: SlotChange,
    ) -> Result<Applied<sighting::Model>, LifecycleError> {
        let uploads: Vec<_> = [(Slot::Photo, &photo), (Slot::Audio, &audio)]
            .into_iter()
            .filter_map(|(slot, change)| match change {
                SlotChange::Replace(upload) => Some((slot, upload)),
                _ => None,
            })
            .collect();
        check_slots(&uploads)?;

        let _guard = self.locks.acquire(id).await;
        let existing = self.records.get(id).await?;

        let written = self.put_uploads(&uploads).await?;
        let photo_ref = ref_update(&photo, written_for(&written, Slot::Photo));
        let audio_ref = ref_update(&audio, written_for(&written, Slot::Audio));

        let updated = match self
            .records
            .update(id, metadata, photo_ref, audio_ref)
            .await
        {
            Ok(updated) => updated,
            Err(RecordStoreError::NotFound(missing)) => {
                // Deleted by someone else; nothing can reference the new blobs.
                let fresh: Vec<_> = written.into_iter().map(|(_, name)| name).collect();
                self.discard(&fresh).await;
                return Err(LifecycleError::NotFound(missing));
            }
            Err(e) => {
                let orphaned: Vec<_> = written.into_iter().map(|(_, name)| name).collect();
                if !orphaned.is_empty() {
                    report(&LifecycleWarning::PartialUpdateFailure { orphaned }, Some(id));
                }
                return Err(e.into());
            }
        };

        let mut superseded = Vec::new();
        if !matches!(photo, SlotChange::Keep) {
            superseded.extend(stored_ref(existing.photo.as_deref(), id));
        }
        if !matches!(audio, SlotChange::Keep) {
            superseded.extend(stored_ref(existing.audio.as_deref(), id));
        }
        let warnings = self.remove_unreferenced(&superseded, id).await;

        info!(
            sighting_id = %id,
            replaced = written.len(),
            removed = superseded.len(),
            "Sighting updated"
        );
        Ok(Applied {
            value: updated,
            warnings,
        })
    }

    /// Delete the record first, then its blobs.
    pub async fn delete(&self, id: Uuid) -> Result<Applied<sighting::Model>, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let deleted = self.records.delete(id).await?;

        let blobs: Vec<_> = [deleted.photo.as_deref(), deleted.audio.as_deref()]
            .into_iter()
            .filter_map(|stored| stored_ref(stored, id))
            .collect();
        let warnings = self.remove_unreferenced(&blobs, id).await;

        info!(sighting_id = %id, blobs = blobs.len(), "Sighting deleted");
        Ok(Applied {
            value: deleted,
            warnings,
        })
    }

    /// Write every upload. If one fails, the ones already written are removed
    /// again since no record can reference them yet.
    async fn put_uploads(
        &self,
        uploads: &[(Slot, &AttachmentUpload)],
    ) -> Result<Vec<(Slot, BlobName)>, LifecycleError> {
        let mut written = Vec::with_capacity(uploads.len());
        for (slot, upload) in uploads {
            match self.blobs.put(&upload.data, &upload.media).await {
                Ok(name) => {
                    debug!(%slot, blob = %name, size = upload.data.len(), "Stored attachment");
                    written.push((*slot, name));
                }
                Err(e) => {
                    let fresh: Vec<_> = written.into_iter().map(|(_, name)| name).collect();
                    self.discard(&fresh).await;
                    return Err(e.into());
                }
            }
        }
        Ok(written)
    }

    /// Best-effort removal of blobs that were never referenced.
    async fn discard(&self, names: &[BlobName]) {
        for name in names {
            if let Err(e) = self.blobs.delete(name).await {
                warn!(blob = %name, error = %e, "Failed to discard unreferenced upload");
            }
        }
    }

    /// Delete blobs no record references any more. Failures become warnings.
    async fn remove_unreferenced(&self, names: &[BlobName], id: Uuid) -> Vec<LifecycleWarning> {
        let mut warnings = Vec::new();
        for name in names {
            match self.blobs.delete(name).await {
                Ok(true) => debug!(sighting_id = %id, blob = %name, "Removed blob"),
                Ok(false) => debug!(sighting_id = %id, blob = %name, "Blob already gone"),
                Err(e) => {
                    let warning = LifecycleWarning::BlobDeleteFailure {
                        blob: name.clone(),
                        reason: e.to_string(),
                    };
                    report(&warning, Some(id));
                    warnings.push(warning);
                }
            }
        }
        warnings
    }
}

fn check_slots(uploads: &[(Slot, &AttachmentUpload)]) -> Result<(), LifecycleError> {
    for (slot, upload) in uploads {
        if upload.media.kind != slot.expected_kind() {
            return Err(LifecycleError::UnsupportedMediaKind(format!(
                "The '{slot}' attachment must be {}, got {}",
                slot.expected_kind(),
                upload.media.kind
            )));
        }
    }
    Ok(())
}

fn written_for(written: &[(Slot, BlobName)], slot: Slot) -> Option<BlobName> {
    written
        .iter()
        .find(|(s, _)| *s == slot)
        .map(|(_, name)| name.clone())
}

fn ref_update(change: &SlotChange, written: Option<BlobName>) -> RefUpdate {
    match (change, written) {
        (SlotChange::Replace(_), Some(name)) => RefUpdate::Set(name),
        (SlotChange::Clear, _) => RefUpdate::Clear,
        _ => RefUpdate::Keep,
    }
}

/// Parse a reference read back from the record store.
fn stored_ref(stored: Option<&str>, id: Uuid) -> Option<BlobName> {
    let stored = stored?;
    match BlobName::parse(stored) {
        Ok(name) => Some(name),
        Err(e) => {
            warn!(sighting_id = %id, stored, error = %e, "Ignoring malformed blob reference");
            None
        }
    }
}

fn report(warning: &LifecycleWarning, id: Option<Uuid>) {
    let sighting_id = id.map(|id| id.to_string()).unwrap_or_default();
    match warning {
        LifecycleWarning::PartialCreateFailure { orphaned } => warn!(
            orphaned = ?orphaned,
            "Record creation failed after attachments were stored; blobs are orphaned"
        ),
        LifecycleWarning::PartialUpdateFailure { orphaned } => warn!(
            sighting_id = %sighting_id,
            orphaned = ?orphaned,
            "Record update failed after attachments were stored; blobs are orphaned"
        ),
        LifecycleWarning::BlobDeleteFailure { blob, reason } => warn!(
            sighting_id = %sighting_id,
            blob = %blob,
            error = %reason,
            "Failed to delete blob"
        ),
    }
}
