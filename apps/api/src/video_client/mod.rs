//! Video client: the single point of entry for the external generation service.
//!
//! No other module talks to the video provider directly; everything goes through
//! the `VideoService` trait so backends can be swapped at startup via `VIDEO_BACKEND`.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod simulated;
#[cfg(test)]
pub mod testing;

/// Model requested from Runway.
pub const RUNWAY_MODEL: &str = "gen-2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process stand-in that advances 25% per status call.
    Simulated,
    Pika,
    Runway,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Simulated => "simulated",
            Backend::Pika => "pika",
            Backend::Runway => "runway",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(Backend::Simulated),
            "pika" => Ok(Backend::Pika),
            "runway" => Ok(Backend::Runway),
            other => Err(format!("unknown video backend '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum VideoServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("no API key configured for {0}")]
    MissingCredential(&'static str),
}

impl VideoServiceError {
    /// Transport hiccups, rate limits and 5xx may succeed on retry; everything
    /// else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            VideoServiceError::Http(_) | VideoServiceError::Timeout => true,
            VideoServiceError::Api { status, .. } => *status == 429 || *status >= 500,
            VideoServiceError::Decode(_) | VideoServiceError::MissingCredential(_) => false,
        }
    }

    /// Client-facing summary. Provider response bodies stay in the logs.
    pub fn public_detail(&self) -> String {
        match self {
            VideoServiceError::Http(_) => "could not reach the video service".to_string(),
            VideoServiceError::Timeout => "the video service timed out".to_string(),
            VideoServiceError::Api { status, .. } => {
                format!("the video service returned HTTP {status}")
            }
            VideoServiceError::Decode(_) => {
                "the video service sent an unexpected response".to_string()
            }
            VideoServiceError::MissingCredential(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub duration: u32,
    pub style: String,
}

/// Job state as reported by the provider, collapsed to what the poller acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: ReportedStatus,
    pub progress: Option<u8>,
    pub video_url: Option<String>,
}

#[async_trait]
pub trait VideoService: Send + Sync {
    /// Submits a generation request and returns the provider's job id.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, VideoServiceError>;

    async fn status(&self, job_id: &str) -> Result<StatusReport, VideoServiceError>;
}

/// Builds the backend selected in config.
pub fn build_video_service(config: &Config) -> Result<Arc<dyn VideoService>> {
    let service: Arc<dyn VideoService> = match config.video_backend {
        Backend::Simulated => Arc::new(simulated::SimulatedVideoService::new()),
        Backend::Pika => Arc::new(HttpVideoClient::new(
            Backend::Pika,
            config.pika_api_url.clone(),
            config.pika_api_key.clone(),
            config.video_http_timeout,
        )?),
        Backend::Runway => Arc::new(HttpVideoClient::new(
            Backend::Runway,
            config.runway_api_url.clone(),
            config.runway_api_key.clone(),
            config.video_http_timeout,
        )?),
    };

    if config.video_backend != Backend::Simulated && config.video_api_key().is_none() {
        warn!(
            backend = %config.video_backend,
            "No API key configured; generation requests will fail until one is set"
        );
    }
    info!(backend = %config.video_backend, "Video client initialized");
    Ok(service)
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP backends (Pika, Runway)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default, rename = "videoUrl", alias = "video_url")]
    video_url: Option<String>,
}

impl StatusBody {
    fn into_report(self) -> Result<StatusReport, VideoServiceError> {
        let status = match self.status.to_ascii_lowercase().as_str() {
            "pending" | "queued" | "processing" | "running" | "in_progress" => {
                ReportedStatus::Processing
            }
            "completed" | "succeeded" | "success" => ReportedStatus::Completed,
            "failed" | "error" | "cancelled" => ReportedStatus::Failed,
            other => {
                return Err(VideoServiceError::Decode(format!(
                    "unknown job status '{other}'"
                )))
            }
        };
        Ok(StatusReport {
            status,
            progress: self.progress.map(|p| p.clamp(0.0, 100.0).round() as u8),
            video_url: self.video_url.filter(|u| !u.trim().is_empty()),
        })
    }
}

/// Bearer-authenticated JSON client for providers exposing
/// `POST {base}/generate` and `GET {base}/generate/{id}`.
#[derive(Clone)]
pub struct HttpVideoClient {
    client: Client,
    backend: Backend,
    base_url: String,
    api_key: Option<String>,
}

impl HttpVideoClient {
    pub fn new(
        backend: Backend,
        base_url: String,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            backend,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str, VideoServiceError> {
        self.api_key
            .as_deref()
            .ok_or(VideoServiceError::MissingCredential(self.backend.as_str()))
    }

    fn body<'a>(&self, request: &'a GenerateRequest) -> GenerateBody<'a> {
        match self.backend {
            Backend::Runway => GenerateBody {
                prompt: &request.prompt,
                duration: request.duration,
                style: Some(&request.style),
                model: Some(RUNWAY_MODEL),
            },
            Backend::Pika | Backend::Simulated => GenerateBody {
                prompt: &request.prompt,
                duration: request.duration,
                style: None,
                model: None,
            },
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, VideoServiceError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                VideoServiceError::Timeout
            } else {
                VideoServiceError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VideoServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VideoService for HttpVideoClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, VideoServiceError> {
        let api_key = self.api_key()?;
        let url = format!("{}/generate", self.base_url);
        debug!(backend = %self.backend, %url, "Submitting generation request");

        let response = self
            .send(
                self.client
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&self.body(request)),
            )
            .await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VideoServiceError::Decode(e.to_string()))?;
        Ok(body.id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusReport, VideoServiceError> {
        let api_key = self.api_key()?;
        let url = format!("{}/generate/{job_id}", self.base_url);

        let response = self
            .send(self.client.get(&url).bearer_auth(api_key))
            .await?;

        let body: StatusBody = response
            .json()
            .await
            .map_err(|e| VideoServiceError::Decode(e.to_string()))?;
        body.into_report()
    }
}
