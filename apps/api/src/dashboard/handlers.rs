use axum::{extract::State, Json};
use chrono::Utc;

use crate::dashboard::{summarize, Dashboard, RECENT_VIDEOS};
use crate::state::AppState;
use crate::tiers::handlers::RequestTier;

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
) -> Json<Dashboard> {
    let videos = state.sessions.video_stats(Utc::now(), RECENT_VIDEOS).await;
    Json(summarize(videos, tier))
}
