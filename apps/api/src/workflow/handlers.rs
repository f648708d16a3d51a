use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::preferences::PreferenceDraft;
use crate::state::AppState;
use crate::tiers::capabilities;
use crate::tiers::handlers::RequestTier;
use crate::workflow::session::SessionView;

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
) -> (StatusCode, Json<SessionView>) {
    let view = state.sessions.create(capabilities(tier)).await;
    (StatusCode::CREATED, Json(view))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.view(id, capabilities(tier)).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/preferences
///
/// Validates the questionnaire against the caller's tier and starts generation.
/// Returns as soon as the task is spawned; progress arrives on `/events`.
pub async fn handle_submit_preferences(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
    Path(id): Path<Uuid>,
    Json(draft): Json<PreferenceDraft>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let caps = capabilities(tier);
    let prefs = draft.validate(&caps)?;
    let view = state
        .sessions
        .start_generation(id, prefs, state.video.clone(), state.config.poll, caps)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

/// POST /api/v1/sessions/:id/restart
pub async fn handle_restart(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.restart(id, capabilities(tier)).await?))
}
