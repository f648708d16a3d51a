use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An accepted CV upload. Immutable once created; superseded handles are dropped
/// from the session, which makes their display URL stop resolving.
#[derive(Debug, Clone, Serialize)]
pub struct CvHandle {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    /// Route that serves the uploaded bytes back for preview.
    pub display_url: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip)]
    pub bytes: Bytes,
}

impl CvHandle {
    pub fn is_plain_text(&self) -> bool {
        self.content_type == "text/plain"
    }
}
