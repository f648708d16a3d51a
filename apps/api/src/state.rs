use std::sync::Arc;

use crate::config::Config;
use crate::video_client::VideoService;
use crate::workflow::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Selected by `VIDEO_BACKEND`. Tests swap in a scripted service.
    pub video: Arc<dyn VideoService>,
    pub sessions: SessionStore,
}
