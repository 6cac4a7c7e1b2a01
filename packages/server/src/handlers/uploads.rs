use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::BlobName;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{name}",
    tag = "Uploads",
    operation_id = "getUpload",
    summary = "Download a stored attachment",
    description = "Streams the blob with a content type inferred from its extension. Blobs are \
        never rewritten, so the name doubles as the ETag and responses are cacheable forever.",
    params(("name" = String, Path, description = "Blob name")),
    responses(
        (status = 200, description = "Attachment content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Upload not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let name = BlobName::parse(&name)?;

    let etag_value = format!("\"{name}\"");
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && val.split(',').any(|tag| {
            let tag = tag.trim();
            tag == etag_value || tag == "*"
        })
        && state.service.blobs().exists(&name).await?
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let size = state.service.blobs().size(&name).await?;
    let reader = state.service.blobs().get_stream(&name).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, name.content_type())
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
