use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::{accept_upload, IntakeError};
use crate::state::AppState;
use crate::tiers::capabilities;
use crate::tiers::handlers::RequestTier;
use crate::workflow::session::SessionView;
use crate::workflow::WorkflowError;

/// Multipart field carrying the CV.
const FILE_FIELD: &str = "file";

/// POST /api/v1/sessions/:id/cv
///
/// Accepts a single CV as multipart field `file`. A new upload replaces the
/// session's current CV.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    if !state.sessions.contains(id).await {
        return Err(WorkflowError::SessionNotFound(id).into());
    }

    while let Some(field) = multipart.next_field().await.map_err(IntakeError::from)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(IntakeError::from)?;

        let cv = accept_upload(id, &file_name, declared.as_deref(), bytes)?;
        let view = state.sessions.attach_cv(id, cv, capabilities(tier)).await?;
        return Ok(Json(view));
    }

    Err(IntakeError::MissingFile.into())
}

/// GET /api/v1/sessions/:id/cv/:cv_id
///
/// Serves the uploaded bytes for preview. Stops resolving once the CV is
/// removed or superseded.
pub async fn handle_get_cv(
    State(state): State<AppState>,
    Path((id, cv_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let cv = state.sessions.cv(id, cv_id).await?;
    Ok(([(header::CONTENT_TYPE, cv.content_type)], cv.bytes))
}

/// DELETE /api/v1/sessions/:id/cv
pub async fn handle_remove_cv(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.remove_cv(id, capabilities(tier)).await?))
}
