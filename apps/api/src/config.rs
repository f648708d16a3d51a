use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::models::tier::SubscriptionTier;
use crate::video_client::Backend;

const DEFAULT_PIKA_API_URL: &str = "https://api.pika.art/v1";
const DEFAULT_RUNWAY_API_URL: &str = "https://api.runwayml.com/v1";

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Externally supplied tier. Mocked as a constant for this build.
    pub subscription_tier: SubscriptionTier,
    pub video_backend: Backend,
    pub pika_api_url: String,
    pub pika_api_key: Option<String>,
    pub runway_api_url: String,
    pub runway_api_key: Option<String>,
    pub video_http_timeout: Duration,
    pub poll: PollSettings,
    pub max_cv_bytes: usize,
    /// Sessions with no request for this long are dropped.
    pub session_idle: Duration,
    pub premium_plan_url: Option<String>,
    pub pro_plan_url: Option<String>,
}

/// Knobs for the status poller. See `generation::poller`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Hard ceiling on status queries for one job.
    pub max_attempts: u32,
    /// Consecutive transient failures tolerated before the job fails.
    /// Zero means the first poll error is terminal.
    pub max_consecutive_errors: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 150,
            max_consecutive_errors: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let poll = PollSettings {
            interval: Duration::from_millis(parse_env("POLL_INTERVAL_MS", 2000u64)?),
            max_attempts: parse_env("POLL_MAX_ATTEMPTS", 150u32)?,
            max_consecutive_errors: parse_env("POLL_MAX_CONSECUTIVE_ERRORS", 3u32)?,
        };

        Ok(Config {
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            subscription_tier: parse_env("SUBSCRIPTION_TIER", SubscriptionTier::Pro)?,
            video_backend: parse_env("VIDEO_BACKEND", Backend::Simulated)?,
            pika_api_url: std::env::var("PIKA_API_URL")
                .unwrap_or_else(|_| DEFAULT_PIKA_API_URL.to_string()),
            pika_api_key: optional_env("PIKA_API_KEY"),
            runway_api_url: std::env::var("RUNWAY_API_URL")
                .unwrap_or_else(|_| DEFAULT_RUNWAY_API_URL.to_string()),
            runway_api_key: optional_env("RUNWAY_API_KEY"),
            video_http_timeout: Duration::from_secs(parse_env("VIDEO_HTTP_TIMEOUT_SECS", 30u64)?),
            poll,
            max_cv_bytes: parse_env("MAX_CV_BYTES", 10 * 1024 * 1024usize)?,
            session_idle: Duration::from_secs(parse_env("SESSION_IDLE_SECS", 1800u64)?),
            premium_plan_url: optional_env("PREMIUM_PLAN_URL"),
            pro_plan_url: optional_env("PRO_PLAN_URL"),
        })
    }

    /// API key for the configured HTTP backend, if any.
    pub fn video_api_key(&self) -> Option<&str> {
        match self.video_backend {
            Backend::Simulated => None,
            Backend::Pika => self.pika_api_key.as_deref(),
            Backend::Runway => self.runway_api_key.as_deref(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests: simulated backend, pro tier, fast polling.
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            subscription_tier: SubscriptionTier::Pro,
            video_backend: Backend::Simulated,
            pika_api_url: DEFAULT_PIKA_API_URL.to_string(),
            pika_api_key: None,
            runway_api_url: DEFAULT_RUNWAY_API_URL.to_string(),
            runway_api_key: None,
            video_http_timeout: Duration::from_secs(5),
            poll: PollSettings::default(),
            max_cv_bytes: 1024 * 1024,
            session_idle: Duration::from_secs(300),
            premium_plan_url: Some("https://checkout.example.com/premium".to_string()),
            pro_plan_url: None,
        }
    }
}
