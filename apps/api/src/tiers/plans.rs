use serde::Serialize;

use crate::config::Config;
use crate::models::tier::SubscriptionTier;

/// A pricing card. Checkout happens on an external page; `checkout_url` is the
/// outbound link when one is configured.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub tier: SubscriptionTier,
    pub name: &'static str,
    pub price: &'static str,
    pub period: Option<&'static str>,
    pub popular: bool,
    pub features: Vec<&'static str>,
    pub limitations: Vec<&'static str>,
    pub cta: &'static str,
    pub checkout_url: Option<String>,
    pub current: bool,
}

pub fn plans(config: &Config, current: SubscriptionTier) -> Vec<Plan> {
    vec![
        Plan {
            tier: SubscriptionTier::Free,
            name: "Free",
            price: "$0",
            period: None,
            popular: false,
            features: vec![
                "Basic video generation",
                "Max 20 seconds",
                "Watermark included",
                "Standard quality",
                "No customization",
            ],
            limitations: vec!["No QR code", "No download"],
            cta: "Current Plan",
            checkout_url: None,
            current: current == SubscriptionTier::Free,
        },
        Plan {
            tier: SubscriptionTier::Premium,
            name: "Premium",
            price: "$19",
            period: Some("/month"),
            popular: true,
            features: vec![
                "Professional videos",
                "No watermark",
                "Full customization",
                "HD quality",
                "Priority support",
            ],
            limitations: vec![],
            cta: "Upgrade to Premium",
            checkout_url: config.premium_plan_url.clone(),
            current: current == SubscriptionTier::Premium,
        },
        Plan {
            tier: SubscriptionTier::Pro,
            name: "Pro",
            price: "$39",
            period: Some("/month"),
            popular: false,
            features: vec![
                "Everything in Premium",
                "QR code generation",
                "Download videos",
                "4K quality",
                "Custom branding",
                "Analytics dashboard",
            ],
            limitations: vec![],
            cta: "Upgrade to Pro",
            checkout_url: config.pro_plan_url.clone(),
            current: current == SubscriptionTier::Pro,
        },
    ]
}
