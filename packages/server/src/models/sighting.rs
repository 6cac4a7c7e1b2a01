use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::MediaType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entity::sighting;
use crate::error::AppError;
use crate::lifecycle::{AttachmentUpload, LifecycleWarning, SlotChange};
use crate::store::SightingMetadata;

const MAX_TEXT_LEN: usize = 4096;

/// Response DTO for a single sighting.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SightingResponse {
    /// Sighting ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: Uuid,
    pub name: Option<String>,
    #[schema(example = "Sabiá")]
    pub species: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[schema(example = -23.5)]
    pub latitude: Option<f64>,
    #[schema(example = -46.6)]
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub observed_at: DateTime<Utc>,
    /// Blob name of the photo attachment.
    #[schema(example = "1718000000000000-123456789.jpg")]
    pub photo: Option<String>,
    /// Blob name of the audio attachment.
    pub audio: Option<String>,
    /// Path the photo is served from.
    #[schema(example = "/uploads/1718000000000000-123456789.jpg")]
    pub photo_url: Option<String>,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SightingResponse {
    pub fn from_model(model: sighting::Model, config: &AppConfig) -> Self {
        Self {
            photo_url: model.photo.as_deref().map(|b| config.public_url(b)),
            audio_url: model.audio.as_deref().map(|b| config.public_url(b)),
            id: model.id,
            name: model.name,
            species: model.species,
            description: model.description,
            notes: model.notes,
            latitude: model.latitude,
            longitude: model.longitude,
            city: model.city,
            country: model.country,
            observed_at: model.observed_at,
            photo: model.photo,
            audio: model.audio,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Confirmation returned by a successful delete.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    #[schema(example = "Sighting deleted")]
    pub message: String,
    pub id: Uuid,
    /// Attachments that could not be removed. The record itself is gone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DeleteResponse {
    pub fn new(id: Uuid, warnings: &[LifecycleWarning]) -> Self {
        Self {
            message: "Sighting deleted".into(),
            id,
            warnings: warnings
                .iter()
                .map(|w| match w {
                    LifecycleWarning::BlobDeleteFailure { blob, .. } => {
                        format!("Failed to remove attachment {blob}")
                    }
                    LifecycleWarning::PartialCreateFailure { orphaned }
                    | LifecycleWarning::PartialUpdateFailure { orphaned } => {
                        format!("{} attachment(s) left unreferenced", orphaned.len())
                    }
                })
                .collect(),
        }
    }
}

/// Text fields of a sighting form, as received.
#[derive(Debug, Default)]
pub struct RawSightingFields {
    pub name: Option<String>,
    pub species: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub observed_at: Option<String>,
    pub remove_photo: Option<String>,
    pub remove_audio: Option<String>,
}

/// A validated create or update request.
#[derive(Debug)]
pub struct SightingForm {
    pub metadata: SightingMetadata,
    pub observed_at: Option<DateTime<Utc>>,
    pub photo: Option<AttachmentUpload>,
    pub audio: Option<AttachmentUpload>,
    pub remove_photo: bool,
    pub remove_audio: bool,
}

impl SightingForm {
    /// Read a `multipart/form-data` body.
    ///
    /// File parts are buffered chunk by chunk and rejected as soon as they
    /// exceed `max_blob_size`. Their declared type is validated here, before
    /// anything reaches the blob store.
    pub async fn from_multipart(
        multipart: &mut Multipart,
        max_blob_size: u64,
    ) -> Result<Self, AppError> {
        let mut fields = RawSightingFields::default();
        let mut photo = None;
        let mut audio = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "photo" | "audio" => {
                    let upload = match read_upload(field, max_blob_size).await {
                        Ok(upload) => upload,
                        Err(e) => {
                            drain(multipart).await;
                            return Err(e);
                        }
                    };
                    if name == "photo" {
                        photo = upload;
                    } else {
                        audio = upload;
                    }
                }
                other => {
                    let slot = match other {
                        "name" => &mut fields.name,
                        "species" => &mut fields.species,
                        "description" => &mut fields.description,
                        "notes" => &mut fields.notes,
                        "latitude" => &mut fields.latitude,
                        "longitude" => &mut fields.longitude,
                        "city" => &mut fields.city,
                        "country" => &mut fields.country,
                        "observed_at" => &mut fields.observed_at,
                        "remove_photo" => &mut fields.remove_photo,
                        "remove_audio" => &mut fields.remove_audio,
                        _ => continue, // Ignore unknown fields.
                    };
                    *slot = Some(field.text().await.map_err(multipart_error)?);
                }
            }
        }

        Self::from_parts(fields, photo, audio)
    }

    /// Validate and coerce raw fields.
    pub fn from_parts(
        fields: RawSightingFields,
        photo: Option<AttachmentUpload>,
        audio: Option<AttachmentUpload>,
    ) -> Result<Self, AppError> {
        let species = optional_text("species", fields.species)?
            .ok_or_else(|| AppError::Validation("Species is required".into()))?;

        let latitude = optional_number("latitude", fields.latitude)?;
        let longitude = optional_number("longitude", fields.longitude)?;
        match (latitude, longitude) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::Validation(
                    "Latitude and longitude must be provided together".into(),
                ));
            }
            _ => {}
        }
        if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
            return Err(AppError::Validation(
                "Latitude must be between -90 and 90".into(),
            ));
        }
        if longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
            return Err(AppError::Validation(
                "Longitude must be between -180 and 180".into(),
            ));
        }

        let observed_at = optional_text("observed_at", fields.observed_at)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| {
                        AppError::Validation("observed_at must be an RFC 3339 timestamp".into())
                    })
            })
            .transpose()?;

        let remove_photo = flag("remove_photo", fields.remove_photo)?;
        let remove_audio = flag("remove_audio", fields.remove_audio)?;
        if remove_photo && photo.is_some() {
            return Err(AppError::Validation(
                "Cannot upload and remove the photo in the same request".into(),
            ));
        }
        if remove_audio && audio.is_some() {
            return Err(AppError::Validation(
                "Cannot upload and remove the audio in the same request".into(),
            ));
        }

        Ok(Self {
            metadata: SightingMetadata {
                name: optional_text("name", fields.name)?,
                species,
                description: optional_text("description", fields.description)?,
                notes: optional_text("notes", fields.notes)?,
                latitude,
                longitude,
                city: optional_text("city", fields.city)?,
                country: optional_text("country", fields.country)?,
            },
            observed_at,
            photo,
            audio,
            remove_photo,
            remove_audio,
        })
    }

    pub fn photo_change(&mut self) -> SlotChange {
        slot_change(self.photo.take(), self.remove_photo)
    }

    pub fn audio_change(&mut self) -> SlotChange {
        slot_change(self.audio.take(), self.remove_audio)
    }
}

fn slot_change(upload: Option<AttachmentUpload>, remove: bool) -> SlotChange {
    match upload {
        Some(upload) => SlotChange::Replace(upload),
        None if remove => SlotChange::Clear,
        None => SlotChange::Keep,
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", e.body_text()))
    }
}

/// Consume whatever is left of a rejected body.
async fn drain(multipart: &mut Multipart) {
    while let Ok(Some(mut field)) = multipart.next_field().await {
        while let Ok(Some(_)) = field.chunk().await {}
    }
}

/// Buffer one file part. An empty part without a filename is what browsers
/// send for an untouched file input and counts as absent.
async fn read_upload(
    mut field: Field<'_>,
    max_size: u64,
) -> Result<Option<AttachmentUpload>, AppError> {
    let file_name = field.file_name().map(str::to_owned);
    let content_type = match field.content_type() {
        Some(ct) => ct.to_owned(),
        None => file_name
            .as_deref()
            .and_then(|f| mime_guess::from_path(f).first())
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".into()),
    };

    // Oversized parts are still read to the end so the client gets the 413
    // instead of a reset connection.
    let mut data = Vec::new();
    let mut total: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        total += chunk.len() as u64;
        if total <= max_size {
            data.extend_from_slice(&chunk);
        }
    }
    if total > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds maximum size of {max_size} bytes"
        )));
    }

    if data.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
        return Ok(None);
    }

    let media = MediaType::from_upload(&content_type, file_name.as_deref())
        .map_err(|e| AppError::UnsupportedMediaKind(e.to_string()))?;
    Ok(Some(AttachmentUpload { data, media }))
}

/// Trim a text field; blank means absent.
fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn optional_number(field: &str, value: Option<String>) -> Result<Option<f64>, AppError> {
    optional_text(field, value)?
        .map(|raw| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| AppError::Validation(format!("{field} must be a number")))
        })
        .transpose()
}

fn flag(field: &str, value: Option<String>) -> Result<bool, AppError> {
    match optional_text(field, value)?.as_deref() {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("on") => {
            Ok(true)
        }
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" || v.eq_ignore_ascii_case("off") => {
            Ok(false)
        }
        Some(_) => Err(AppError::Validation(format!("{field} must be true or false"))),
    }
}
