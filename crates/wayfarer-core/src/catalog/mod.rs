//! The activity catalog: three fixed tiers of templates.
//!
//! Each template prices itself as a fraction of the **daily** budget, so the
//! same catalog works for any trip length or budget size.

use std::fmt;

use serde::Serialize;

/// Placeholder replaced by the destination name in template descriptions.
pub const DESTINATION_PLACEHOLDER: &str = "{destination}";

/// Relative price level of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// A catalog entry: the shape of an activity before it is bound to a day
/// or a price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityTemplate {
    pub tier: Tier,
    pub title: &'static str,
    /// May contain [`DESTINATION_PLACEHOLDER`].
    pub description: &'static str,
    pub duration_minutes: i32,
    /// Share of the daily budget, in `0.0..=0.30`.
    pub cost_ratio: f64,
}

impl ActivityTemplate {
    /// Render the description for a destination.
    pub fn describe(&self, destination: &str) -> String {
        self.description.replace(DESTINATION_PLACEHOLDER, destination)
    }
}

const fn template(
    tier: Tier,
    title: &'static str,
    description: &'static str,
    duration_minutes: i32,
    cost_ratio: f64,
) -> ActivityTemplate {
    ActivityTemplate {
        tier,
        title,
        description,
        duration_minutes,
        cost_ratio,
    }
}

pub static LOW_TIER: [ActivityTemplate; 6] = [
    template(
        Tier::Low,
        "Free Walking Tour",
        "Explore {destination} on foot with a local guide",
        180,
        0.0,
    ),
    template(
        Tier::Low,
        "Local Park Visit",
        "Relax and enjoy the green spaces",
        120,
        0.0,
    ),
    template(
        Tier::Low,
        "Street Food Experience",
        "Try authentic street food",
        90,
        0.05,
    ),
    template(
        Tier::Low,
        "Public Beach Day",
        "Enjoy the sun and sea",
        240,
        0.0,
    ),
    template(
        Tier::Low,
        "Local Market Exploration",
        "Browse local vendors and crafts",
        120,
        0.03,
    ),
    template(
        Tier::Low,
        "Scenic Viewpoint",
        "Catch amazing views of the city",
        60,
        0.0,
    ),
];

pub static MEDIUM_TIER: [ActivityTemplate; 6] = [
    template(
        Tier::Medium,
        "Museum Visit",
        "Discover local history and art",
        150,
        0.08,
    ),
    template(
        Tier::Medium,
        "Local Food Tour",
        "Taste the flavors of {destination}",
        180,
        0.12,
    ),
    template(
        Tier::Medium,
        "Guided City Tour",
        "Professional tour of main attractions",
        240,
        0.15,
    ),
    template(
        Tier::Medium,
        "Cultural Show",
        "Experience local performing arts",
        120,
        0.10,
    ),
    template(
        Tier::Medium,
        "Cooking Class",
        "Learn to make local dishes",
        180,
        0.15,
    ),
    template(
        Tier::Medium,
        "Boat/Ferry Ride",
        "See the city from the water",
        90,
        0.08,
    ),
];

pub static HIGH_TIER: [ActivityTemplate; 6] = [
    template(
        Tier::High,
        "Fine Dining Experience",
        "Upscale culinary adventure",
        150,
        0.20,
    ),
    template(
        Tier::High,
        "Private Guided Tour",
        "Personalized exploration",
        300,
        0.25,
    ),
    template(
        Tier::High,
        "Adventure Activity",
        "Thrilling outdoor experience",
        240,
        0.18,
    ),
    template(
        Tier::High,
        "Spa & Wellness",
        "Relax and rejuvenate",
        180,
        0.15,
    ),
    template(
        Tier::High,
        "VIP Attraction Access",
        "Skip-the-line premium experience",
        180,
        0.20,
    ),
    template(
        Tier::High,
        "Sunset Yacht Cruise",
        "Luxury evening on the water",
        180,
        0.22,
    ),
];

/// All templates of a tier, in catalog order.
pub fn templates(tier: Tier) -> &'static [ActivityTemplate] {
    match tier {
        Tier::Low => &LOW_TIER,
        Tier::Medium => &MEDIUM_TIER,
        Tier::High => &HIGH_TIER,
    }
}
