//! Scripted `VideoService` for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::video_client::{
    GenerateRequest, ReportedStatus, StatusReport, VideoService, VideoServiceError,
};

/// Replays queued status responses in order. Once the queue is empty every
/// status call reports `Processing` with no progress.
pub struct ScriptedVideoService {
    generate_result: Mutex<Option<Result<String, VideoServiceError>>>,
    statuses: Mutex<VecDeque<Result<StatusReport, VideoServiceError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    status_calls: AtomicU32,
}

impl ScriptedVideoService {
    pub fn new(job_id: &str) -> Self {
        Self {
            generate_result: Mutex::new(Some(Ok(job_id.to_string()))),
            statuses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            status_calls: AtomicU32::new(0),
        }
    }

    pub fn failing_submit(err: VideoServiceError) -> Self {
        let service = Self::new("unused");
        *service.generate_result.lock().unwrap() = Some(Err(err));
        service
    }

    pub fn then(self, report: Result<StatusReport, VideoServiceError>) -> Self {
        self.statuses.lock().unwrap().push_back(report);
        self
    }

    pub fn then_processing(self, progress: u8) -> Self {
        self.then(Ok(processing(progress)))
    }

    pub fn then_completed(self, url: &str) -> Self {
        self.then(Ok(StatusReport {
            status: ReportedStatus::Completed,
            progress: Some(100),
            video_url: Some(url.to_string()),
        }))
    }

    pub fn then_failed(self) -> Self {
        self.then(Ok(StatusReport {
            status: ReportedStatus::Failed,
            progress: None,
            video_url: None,
        }))
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn processing(progress: u8) -> StatusReport {
    StatusReport {
        status: ReportedStatus::Processing,
        progress: Some(progress),
        video_url: None,
    }
}

#[async_trait]
impl VideoService for ScriptedVideoService {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, VideoServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.generate_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("job_again".to_string()))
    }

    async fn status(&self, _job_id: &str) -> Result<StatusReport, VideoServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(StatusReport {
                    status: ReportedStatus::Processing,
                    progress: None,
                    video_url: None,
                })
            })
    }
}
