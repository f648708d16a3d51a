//! Tier Gate: static lookup from subscription tier to enabled affordances.
//!
//! This is a table, not a policy engine: no inputs other than the tier.

pub mod handlers;
pub mod plans;

use serde::Serialize;

use crate::models::job::{GenerationJob, JobStatus};
use crate::models::preferences::MAX_DURATION_SECS;
use crate::models::tier::SubscriptionTier;

pub const WATERMARK_LABEL: &str = "AI VidCV Free Version";

/// How the download button renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DownloadAccess {
    /// No button at all.
    Hidden,
    /// Button shown but inert, with an upsell note.
    Disabled { note: &'static str },
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub tier: SubscriptionTier,
    pub watermark: bool,
    pub qr_code: bool,
    pub download: DownloadAccess,
    /// Upper bound for the questionnaire's duration control, in seconds.
    pub max_duration: u32,
    /// Whether style and tone may differ from the defaults.
    pub customization: bool,
}

pub fn capabilities(tier: SubscriptionTier) -> Capabilities {
    match tier {
        SubscriptionTier::Free => Capabilities {
            tier,
            watermark: true,
            qr_code: false,
            download: DownloadAccess::Hidden,
            max_duration: MAX_DURATION_SECS,
            customization: false,
        },
        SubscriptionTier::Premium => Capabilities {
            tier,
            watermark: false,
            qr_code: false,
            download: DownloadAccess::Disabled { note: "Pro Only" },
            max_duration: MAX_DURATION_SECS,
            customization: true,
        },
        SubscriptionTier::Pro => Capabilities {
            tier,
            watermark: false,
            qr_code: true,
            download: DownloadAccess::Enabled,
            max_duration: MAX_DURATION_SECS,
            customization: true,
        },
    }
}

/// What the result panel may show for a completed job under a given tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub video_url: String,
    pub watermark: Option<&'static str>,
    pub download: DownloadAccess,
    pub qr_code_url: Option<String>,
}

impl ResultView {
    /// `None` unless the job completed.
    pub fn for_job(job: &GenerationJob, caps: &Capabilities) -> Option<Self> {
        match &job.status {
            JobStatus::Completed {
                result_url,
                qr_code_url,
            } => Some(ResultView {
                video_url: result_url.clone(),
                watermark: caps.watermark.then_some(WATERMARK_LABEL),
                download: caps.download,
                qr_code_url: caps.qr_code.then(|| qr_code_url.clone()),
            }),
            JobStatus::Pending | JobStatus::Processing | JobStatus::Failed { .. } => None,
        }
    }
}
