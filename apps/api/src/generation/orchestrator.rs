//! Generation orchestrator: turns a CV and questionnaire answers into a
//! provider job id.

use thiserror::Error;
use tracing::{debug, info};

use crate::generation::prompts::video_prompt;
use crate::intake::cv_excerpt;
use crate::models::cv::CvHandle;
use crate::models::preferences::PreferenceConfig;
use crate::video_client::{GenerateRequest, VideoService, VideoServiceError};

#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Submission is blocked outright rather than sent unauthenticated.
    #[error("no API key configured for {0}")]
    MissingCredential(&'static str),

    #[error("video service returned an empty job id")]
    EmptyJobId,

    #[error("generation request failed: {0}")]
    Service(VideoServiceError),
}

impl From<VideoServiceError> for SubmissionError {
    fn from(e: VideoServiceError) -> Self {
        match e {
            VideoServiceError::MissingCredential(backend) => {
                SubmissionError::MissingCredential(backend)
            }
            other => SubmissionError::Service(other),
        }
    }
}

impl SubmissionError {
    /// Safe to show to the client; see `VideoServiceError::public_detail`.
    pub fn public_detail(&self) -> String {
        match self {
            SubmissionError::Service(e) => e.public_detail(),
            SubmissionError::MissingCredential(_) | SubmissionError::EmptyJobId => self.to_string(),
        }
    }
}

pub fn build_request(cv: &CvHandle, prefs: &PreferenceConfig) -> GenerateRequest {
    GenerateRequest {
        prompt: video_prompt(prefs, &cv_excerpt(cv)),
        duration: prefs.duration.secs(),
        style: prefs.style.as_str().to_string(),
    }
}

/// Submits one generation request and returns the provider's job id.
pub async fn submit(
    service: &dyn VideoService,
    cv: &CvHandle,
    prefs: &PreferenceConfig,
) -> Result<String, SubmissionError> {
    let request = build_request(cv, prefs);
    debug!(prompt = %request.prompt, "Built generation prompt");

    let job_id = service.generate(&request).await?;
    let job_id = job_id.trim();
    if job_id.is_empty() {
        return Err(SubmissionError::EmptyJobId);
    }

    info!(%job_id, duration = request.duration, "Generation request accepted");
    Ok(job_id.to_string())
}
