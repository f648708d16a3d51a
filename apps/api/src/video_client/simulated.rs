//! In-process stand-in for the video provider.
//!
//! Each status call moves a job forward by `STEP` percent; the call that reaches
//! 100 reports completion with a placeholder clip. Progress is tracked per
//! instance and dropped once a job completes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::video_client::{
    GenerateRequest, ReportedStatus, StatusReport, VideoService, VideoServiceError,
};

pub const PLACEHOLDER_VIDEO_URL: &str = "https://www.w3schools.com/html/mov_bbb.mp4";
const STEP: u8 = 25;

pub struct SimulatedVideoService {
    submit_delay: Duration,
    status_delay: Duration,
    progress: Mutex<HashMap<String, u8>>,
}

impl SimulatedVideoService {
    pub fn new() -> Self {
        Self::with_delays(Duration::from_millis(500), Duration::from_millis(1500))
    }

    pub fn with_delays(submit_delay: Duration, status_delay: Duration) -> Self {
        Self {
            submit_delay,
            status_delay,
            progress: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for SimulatedVideoService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoService for SimulatedVideoService {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, VideoServiceError> {
        debug!(prompt = %request.prompt, duration = request.duration, "Simulated generation request");
        tokio::time::sleep(self.submit_delay).await;
        Ok(format!("pika_mock_{}", Utc::now().timestamp_millis()))
    }

    async fn status(&self, job_id: &str) -> Result<StatusReport, VideoServiceError> {
        let current = {
            let mut progress = self.progress.lock().await;
            let entry = progress.entry(job_id.to_string()).or_insert(0);
            *entry = entry.saturating_add(STEP);
            let current = *entry;
            if current >= 100 {
                progress.remove(job_id);
            }
            current
        };

        tokio::time::sleep(self.status_delay).await;

        if current >= 100 {
            Ok(StatusReport {
                status: ReportedStatus::Completed,
                progress: Some(100),
                video_url: Some(PLACEHOLDER_VIDEO_URL.to_string()),
            })
        } else {
            Ok(StatusReport {
                status: ReportedStatus::Processing,
                progress: Some(current),
                video_url: None,
            })
        }
    }
}
