// Dashboard summary: stat cards and recent videos, computed from the
// in-memory history.

pub mod handlers;

use serde::Serialize;

use crate::models::tier::SubscriptionTier;
use crate::workflow::store::{VideoRecord, VideoStats};

pub const RECENT_VIDEOS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub caption: String,
}

/// Two stat cards ("Videos Generated" with a this-month caption, and
/// "Subscription") plus the newest videos.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: Vec<StatCard>,
    pub recent_videos: Vec<VideoRecord>,
}

pub fn summarize(videos: VideoStats, tier: SubscriptionTier) -> Dashboard {
    let stats = vec![
        StatCard {
            title: "Videos Generated",
            value: videos.total.to_string(),
            caption: format!("+{} this month", videos.this_month),
        },
        StatCard {
            title: "Subscription",
            value: plan_name(tier).to_string(),
            caption: "Current plan".to_string(),
        },
    ];

    Dashboard {
        stats,
        recent_videos: videos.recent.into_iter().take(RECENT_VIDEOS).collect(),
    }
}

fn plan_name(tier: SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Free => "Free",
        SubscriptionTier::Premium => "Premium",
        SubscriptionTier::Pro => "Pro",
    }
}
