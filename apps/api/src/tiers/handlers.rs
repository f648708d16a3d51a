use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    Json,
};

use crate::errors::AppError;
use crate::models::tier::SubscriptionTier;
use crate::state::AppState;
use crate::tiers::plans::{plans, Plan};
use crate::tiers::{capabilities, Capabilities};

/// Header that overrides the configured tier for one request.
pub const TIER_HEADER: &str = "x-subscription-tier";

/// The caller's tier: `x-subscription-tier` if present, else the configured tier.
#[derive(Debug, Clone, Copy)]
pub struct RequestTier(pub SubscriptionTier);

#[async_trait]
impl FromRequestParts<AppState> for RequestTier {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let Some(value) = parts.headers.get(TIER_HEADER) else {
            return Ok(RequestTier(state.config.subscription_tier));
        };
        let raw = value
            .to_str()
            .map_err(|_| AppError::Validation(format!("{TIER_HEADER} must be ASCII")))?;
        raw.parse().map(RequestTier).map_err(AppError::Validation)
    }
}

/// GET /api/v1/tiers/:tier/capabilities
pub async fn handle_capabilities(
    Path(tier): Path<String>,
) -> Result<Json<Capabilities>, AppError> {
    let tier: SubscriptionTier = tier.parse().map_err(AppError::NotFound)?;
    Ok(Json(capabilities(tier)))
}

/// GET /api/v1/plans
pub async fn handle_plans(
    State(state): State<AppState>,
    RequestTier(tier): RequestTier,
) -> Json<Vec<Plan>> {
    Json(plans(&state.config, tier))
}
