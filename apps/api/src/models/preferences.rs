//! Questionnaire answers.
//!
//! `PreferenceDraft` is what the client sends; `PreferenceConfig` only exists
//! once the draft has been checked against the caller's tier, so downstream code
//! never re-validates the duration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tiers::Capabilities;

pub const MIN_DURATION_SECS: u32 = 10;
pub const MAX_DURATION_SECS: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    #[default]
    Professional,
    Creative,
    Technical,
    Executive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStyle {
    #[default]
    Modern,
    Bold,
    Minimal,
    Vibrant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Confident,
    Friendly,
    Formal,
    Enthusiastic,
}

/// Sections of the CV the video should emphasise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Highlight {
    #[serde(rename = "Skills & Expertise")]
    SkillsAndExpertise,
    #[serde(rename = "Work Experience")]
    WorkExperience,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Achievements")]
    Achievements,
    #[serde(rename = "Projects")]
    Projects,
    #[serde(rename = "Certifications")]
    Certifications,
}

impl VideoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoType::Professional => "professional",
            VideoType::Creative => "creative",
            VideoType::Technical => "technical",
            VideoType::Executive => "executive",
        }
    }
}

impl VideoStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStyle::Modern => "modern",
            VideoStyle::Bold => "bold",
            VideoStyle::Minimal => "minimal",
            VideoStyle::Vibrant => "vibrant",
        }
    }
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Confident => "confident",
            Tone::Friendly => "friendly",
            Tone::Formal => "formal",
            Tone::Enthusiastic => "enthusiastic",
        }
    }
}

impl Highlight {
    pub fn label(&self) -> &'static str {
        match self {
            Highlight::SkillsAndExpertise => "Skills & Expertise",
            Highlight::WorkExperience => "Work Experience",
            Highlight::Education => "Education",
            Highlight::Achievements => "Achievements",
            Highlight::Projects => "Projects",
            Highlight::Certifications => "Certifications",
        }
    }
}

/// Video length in seconds, always within `[MIN_DURATION_SECS, MAX_DURATION_SECS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VideoDuration(u32);

impl VideoDuration {
    pub fn new(secs: u32, max_secs: u32) -> Result<Self, PreferenceError> {
        let upper = max_secs.min(MAX_DURATION_SECS);
        if !(MIN_DURATION_SECS..=upper).contains(&secs) {
            return Err(PreferenceError::DurationOutOfRange {
                secs,
                min: MIN_DURATION_SECS,
                max: upper,
            });
        }
        Ok(Self(secs))
    }

    pub fn secs(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("duration {secs}s is outside the allowed range {min}-{max}s")]
    DurationOutOfRange { secs: u32, min: u32, max: u32 },

    #[error("job goal cannot be empty")]
    EmptyJobGoal,

    #[error("custom {field} requires a paid plan")]
    CustomizationLocked { field: &'static str },
}

/// Raw questionnaire submission. Field defaults mirror the form's initial state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceDraft {
    #[serde(default)]
    pub video_type: VideoType,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub job_goal: String,
    #[serde(default)]
    pub style: VideoStyle,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

fn default_duration() -> u32 {
    15
}

/// Validated questionnaire answers. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceConfig {
    pub video_type: VideoType,
    pub duration: VideoDuration,
    pub job_goal: String,
    pub style: VideoStyle,
    pub tone: Tone,
    /// Selection order preserved, duplicates removed.
    pub highlights: Vec<Highlight>,
}

impl PreferenceDraft {
    pub fn validate(self, capabilities: &Capabilities) -> Result<PreferenceConfig, PreferenceError> {
        let duration = VideoDuration::new(self.duration, capabilities.max_duration)?;

        let job_goal = self.job_goal.trim().to_string();
        if job_goal.is_empty() {
            return Err(PreferenceError::EmptyJobGoal);
        }

        if !capabilities.customization {
            if self.style != VideoStyle::default() {
                return Err(PreferenceError::CustomizationLocked { field: "style" });
            }
            if self.tone != Tone::default() {
                return Err(PreferenceError::CustomizationLocked { field: "tone" });
            }
        }

        let mut highlights = Vec::with_capacity(self.highlights.len());
        for h in self.highlights {
            if !highlights.contains(&h) {
                highlights.push(h);
            }
        }

        Ok(PreferenceConfig {
            video_type: self.video_type,
            duration,
            job_goal,
            style: self.style,
            tone: self.tone,
            highlights,
        })
    }
}
