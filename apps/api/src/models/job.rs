//! Generation job state.
//!
//! A job moves `Pending -> Processing -> Completed | Failed` and never leaves a
//! terminal state. It is mutated only by the task that owns it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Percentage complete. Never decreases across updates for the same job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const DONE: Progress = Progress(100);

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Folds in a reported value: clamps to 100 and keeps the maximum.
    pub fn advance(&mut self, reported: u8) {
        self.0 = self.0.max(reported.min(100));
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The generation request never produced a job id.
    Submission(String),
    /// Status queries kept failing.
    Poll(String),
    /// The service itself reported the job as failed.
    ServiceReported,
    /// The service reported completion without a video URL.
    MissingResultUrl,
    /// The attempt ceiling was reached before a terminal status.
    TimedOut { attempts: u32 },
    QrEncoding(String),
}

impl FailureReason {
    /// Short message suitable for the failure panel.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::TimedOut { .. } => {
                "Video generation took too long. Please try again."
            }
            _ => "Something went wrong while creating your video. Please try again.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed {
        result_url: String,
        qr_code_url: String,
    },
    Failed {
        reason: FailureReason,
    },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job is already {0}")]
    AlreadyTerminal(&'static str),

    #[error("job must be {expected} but is {actual}")]
    InvalidTransition {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationJob {
    /// Assigned by the external service once submission succeeds.
    pub job_id: Option<String>,
    #[serde(flatten)]
    pub status: JobStatus,
    pub progress: Progress,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    pub fn new() -> Self {
        Self {
            job_id: None,
            status: JobStatus::Pending,
            progress: Progress::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_live(&self) -> Result<(), JobError> {
        if self.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.status.name()));
        }
        Ok(())
    }

    /// pending -> processing, recording the service-assigned id.
    pub fn start_processing(&mut self, job_id: String) -> Result<(), JobError> {
        self.ensure_live()?;
        if self.status != JobStatus::Pending {
            return Err(JobError::InvalidTransition {
                expected: "pending",
                actual: self.status.name(),
            });
        }
        self.job_id = Some(job_id);
        self.status = JobStatus::Processing;
        Ok(())
    }

    pub fn record_progress(&mut self, reported: u8) -> Result<(), JobError> {
        self.ensure_live()?;
        self.progress.advance(reported);
        Ok(())
    }

    pub fn complete(&mut self, result_url: String, qr_code_url: String) -> Result<(), JobError> {
        self.ensure_live()?;
        if self.status != JobStatus::Processing {
            return Err(JobError::InvalidTransition {
                expected: "processing",
                actual: self.status.name(),
            });
        }
        self.progress = Progress::DONE;
        self.status = JobStatus::Completed {
            result_url,
            qr_code_url,
        };
        Ok(())
    }

    /// Any live state may fail: submission errors fail a pending job.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), JobError> {
        self.ensure_live()?;
        self.status = JobStatus::Failed { reason };
        Ok(())
    }
}

impl Default for GenerationJob {
    fn default() -> Self {
        Self::new()
    }
}
