use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::models::sighting::{DeleteResponse, SightingForm, SightingResponse};
use crate::state::AppState;

/// Room for both attachments plus the text fields.
pub fn sighting_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = max_blob_size.saturating_mul(2).saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Sightings",
    operation_id = "listSightings",
    summary = "List sightings",
    description = "Returns every sighting, most recently observed first. Ties are broken by ID, \
        newest first.",
    responses(
        (status = 200, description = "All sightings", body = Vec<SightingResponse>),
        (status = 500, description = "Record store unavailable (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_sightings(
    State(state): State<AppState>,
) -> Result<Json<Vec<SightingResponse>>, AppError> {
    let sightings = state.service.list().await?;
    Ok(Json(
        sightings
            .into_iter()
            .map(|s| SightingResponse::from_model(s, &state.config))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Sightings",
    operation_id = "getSighting",
    summary = "Get a sighting by ID",
    params(("id" = Uuid, Path, description = "Sighting ID")),
    responses(
        (status = 200, description = "Sighting details", body = SightingResponse),
        (status = 404, description = "Sighting not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(sighting_id = %id))]
pub async fn get_sighting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SightingResponse>, AppError> {
    let sighting = state.service.get(id).await?;
    Ok(Json(SightingResponse::from_model(sighting, &state.config)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Sightings",
    operation_id = "createSighting",
    summary = "Record a sighting",
    description = "Creates a sighting from a multipart form. `species` is required. Optional \
        `photo` (image/*) and `audio` (audio/*) file parts are stored before the record is \
        written. `observed_at` (RFC 3339) defaults to now.",
    request_body(content_type = "multipart/form-data", description = "Sighting fields and attachments"),
    responses(
        (status = 200, description = "Sighting created", body = SightingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "Attachment too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Attachment of the wrong kind (UNSUPPORTED_MEDIA_KIND)", body = ErrorBody),
        (status = 500, description = "Record store unavailable (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(sighting_id))]
pub async fn create_sighting(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SightingResponse>, AppError> {
    let form =
        SightingForm::from_multipart(&mut multipart, state.config.storage.max_blob_size).await?;

    let created = state
        .service
        .create(form.metadata, form.observed_at, form.photo, form.audio)
        .await?;

    tracing::Span::current().record("sighting_id", tracing::field::display(created.id));
    Ok(Json(SightingResponse::from_model(created, &state.config)))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Sightings",
    operation_id = "updateSighting",
    summary = "Update a sighting",
    description = "Replaces every metadata field; omitted fields are cleared. A `photo` or \
        `audio` part replaces that attachment, `remove_photo=true` / `remove_audio=true` drops \
        it, and slots without either are left untouched. The observation time never changes.",
    params(("id" = Uuid, Path, description = "Sighting ID")),
    request_body(content_type = "multipart/form-data", description = "Sighting fields and attachments"),
    responses(
        (status = 200, description = "Sighting updated", body = SightingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Sighting not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Attachment too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Attachment of the wrong kind (UNSUPPORTED_MEDIA_KIND)", body = ErrorBody),
        (status = 500, description = "Record store unavailable (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(sighting_id = %id))]
pub async fn update_sighting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SightingResponse>, AppError> {
    let mut form =
        SightingForm::from_multipart(&mut multipart, state.config.storage.max_blob_size).await?;
    let photo = form.photo_change();
    let audio = form.audio_change();

    // Warnings about superseded blobs are logged by the service. The response
    // stays the plain record so PUT and GET return the same shape.
    let updated = state.service.update(id, form.metadata, photo, audio).await?;
    Ok(Json(SightingResponse::from_model(
        updated.value,
        &state.config,
    )))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Sightings",
    operation_id = "deleteSighting",
    summary = "Delete a sighting",
    description = "Removes the record, then its attachments. Attachments that cannot be removed \
        are reported in `warnings`; the record is gone either way.",
    params(("id" = Uuid, Path, description = "Sighting ID")),
    responses(
        (status = 200, description = "Sighting deleted", body = DeleteResponse),
        (status = 404, description = "Sighting not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Record store unavailable (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(sighting_id = %id))]
pub async fn delete_sighting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.service.delete(id).await?;
    Ok(Json(DeleteResponse::new(deleted.value.id, &deleted.warnings)))
}
