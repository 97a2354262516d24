//! Day planner: turns an allocation into a concrete, ordered schedule.
//!
//! Every day gets [`ACTIVITIES_PER_DAY`] templates drawn from the pool
//! without replacement, priced against the daily budget and placed at
//! fixed start times three hours apart starting at 09:00.

use rand::rngs::StdRng;
use rand::seq::{SliceRandom, index};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::{AllocationError, PoolPolicy};
use crate::catalog::ActivityTemplate;

pub const ACTIVITIES_PER_DAY: usize = 3;
pub const FIRST_START_HOUR: u32 = 9;
pub const START_SPACING_HOURS: u32 = 3;

/// Duration applied when a draft does not say how long it takes.
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

/// An activity that has not been persisted yet: no id, no timestamp.
///
/// Produced by the planner and accepted by bulk replace. `itinerary_id` may
/// be omitted; when present it must match the target itinerary.
/// `order_index` may be omitted and is then assigned at the end of its day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary_id: Option<Uuid>,
    pub day_number: i32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl ActivityDraft {
    fn from_template(
        template: &ActivityTemplate,
        destination: &str,
        day_number: i32,
        position: usize,
        daily_budget: f64,
    ) -> Self {
        Self {
            itinerary_id: None,
            day_number,
            title: template.title.to_owned(),
            description: Some(template.describe(destination)),
            location: None,
            start_time: Some(format_start_time(position)),
            duration_minutes: template.duration_minutes,
            estimated_cost: (daily_budget * template.cost_ratio).round(),
            order_index: Some(position as i32),
            notes: None,
            photo_url: None,
        }
    }
}

/// `HH:MM` start time of the `position`-th activity of a day.
pub fn format_start_time(position: usize) -> String {
    let hour = FIRST_START_HOUR + START_SPACING_HOURS * position as u32;
    format!("{hour:02}:00")
}

/// Generates schedules under a [`PoolPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Planner {
    pub policy: PoolPolicy,
}

impl Planner {
    pub fn new(policy: PoolPolicy) -> Self {
        Self { policy }
    }

    /// Generate `ACTIVITIES_PER_DAY * day_count` drafts, grouped by day and
    /// ordered within each day.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        destination: &str,
        day_count: i64,
        total_budget: f64,
        rng: &mut R,
    ) -> Result<Vec<ActivityDraft>, AllocationError> {
        let allocation = self.policy.allocate(total_budget, day_count)?;
        let pool = &allocation.pool;

        let mut drafts = Vec::with_capacity(ACTIVITIES_PER_DAY * day_count as usize);
        for day in 1..=day_count as i32 {
            for (position, pick) in draw_day(pool.len(), rng).into_iter().enumerate() {
                drafts.push(ActivityDraft::from_template(
                    pool[pick],
                    destination,
                    day,
                    position,
                    allocation.daily_budget,
                ));
            }
        }

        Ok(drafts)
    }
}

/// Pick pool indices for one day.
///
/// A pool that cannot fill a day is used whole in shuffled order, with the
/// remaining positions sampled with replacement.
fn draw_day<R: Rng + ?Sized>(pool_len: usize, rng: &mut R) -> Vec<usize> {
    if pool_len >= ACTIVITIES_PER_DAY {
        return index::sample(rng, pool_len, ACTIVITIES_PER_DAY).into_vec();
    }

    let mut picks: Vec<usize> = (0..pool_len).collect();
    picks.shuffle(rng);
    while picks.len() < ACTIVITIES_PER_DAY {
        picks.push(rng.random_range(0..pool_len));
    }
    picks
}

/// [`Planner::generate`] with the default policy.
pub fn generate<R: Rng + ?Sized>(
    destination: &str,
    day_count: i64,
    total_budget: f64,
    rng: &mut R,
) -> Result<Vec<ActivityDraft>, AllocationError> {
    Planner::default().generate(destination, day_count, total_budget, rng)
}

/// Deterministic [`generate`]: the same seed always yields the same drafts.
pub fn generate_seeded(
    destination: &str,
    day_count: i64,
    total_budget: f64,
    seed: u64,
) -> Result<Vec<ActivityDraft>, AllocationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(destination, day_count, total_budget, &mut rng)
}

/// Rng for a planning request: seeded when asked, OS-seeded otherwise.
pub fn planner_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
