//! Budget allocation: daily budget and template pool selection.
//!
//! The daily budget (`total / days`) is bucketed into a [`BudgetBand`] by two
//! thresholds, and each band draws from a fixed slice of the catalog tiers.
//! [`PoolPolicy::default`] reproduces this table:
//!
//! ```text
//! daily <  100        low[..]   + medium[..2]
//! 100 <= daily < 300  low[..3]  + medium[..]
//! daily >= 300        medium[..3] + high[..]
//! ```

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{ActivityTemplate, Tier, templates};

/// Longest trip the allocator accepts, in days. Day numbers are stored as
/// `i32`, so this is the largest day number a schedule can carry.
pub const MAX_TRIP_DAYS: i64 = i32::MAX as i64;

/// Errors from [`PoolPolicy::allocate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("trip must span at least one day (got {0})")]
    InvalidDays(i64),

    #[error("trip spans {days} days, more than the {max} allowed")]
    TooManyDays { days: i64, max: i64 },

    #[error("budget must be a positive amount (got {0})")]
    InvalidBudget(f64),

    #[error("policy selected an empty template pool")]
    EmptyPool,
}

/// Price band a daily budget falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetBand {
    Low,
    Medium,
    High,
}

impl fmt::Display for BudgetBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// A leading slice of one catalog tier. `take: None` means the whole tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSlice {
    pub tier: Tier,
    pub take: Option<usize>,
}

impl TierSlice {
    pub const fn all(tier: Tier) -> Self {
        Self { tier, take: None }
    }

    pub const fn first(tier: Tier, n: usize) -> Self {
        Self {
            tier,
            take: Some(n),
        }
    }

    fn templates(&self) -> &'static [ActivityTemplate] {
        let all = templates(self.tier);
        match self.take {
            Some(n) => &all[..n.min(all.len())],
            None => all,
        }
    }
}

/// Thresholds and pool composition for each band.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPolicy {
    /// Daily budgets at or above this leave the low band.
    pub medium_threshold: f64,
    /// Daily budgets at or above this are in the high band.
    pub high_threshold: f64,
    pub low_pool: Vec<TierSlice>,
    pub medium_pool: Vec<TierSlice>,
    pub high_pool: Vec<TierSlice>,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            medium_threshold: 100.0,
            high_threshold: 300.0,
            low_pool: vec![TierSlice::all(Tier::Low), TierSlice::first(Tier::Medium, 2)],
            medium_pool: vec![TierSlice::first(Tier::Low, 3), TierSlice::all(Tier::Medium)],
            high_pool: vec![TierSlice::first(Tier::Medium, 3), TierSlice::all(Tier::High)],
        }
    }
}

/// Result of allocating a trip budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub daily_budget: f64,
    pub band: BudgetBand,
    pub pool: Vec<&'static ActivityTemplate>,
}

impl PoolPolicy {
    /// Replace the two thresholds, keeping the pool composition.
    ///
    /// Both must be positive and `medium < high`.
    pub fn with_thresholds(mut self, medium: f64, high: f64) -> Result<Self, String> {
        if !(medium.is_finite() && high.is_finite()) || medium <= 0.0 || medium >= high {
            return Err(format!(
                "thresholds must satisfy 0 < medium < high (got medium={medium}, high={high})"
            ));
        }
        self.medium_threshold = medium;
        self.high_threshold = high;
        Ok(self)
    }

    /// Band for a daily budget. Thresholds are inclusive lower bounds.
    pub fn band_for(&self, daily_budget: f64) -> BudgetBand {
        if daily_budget < self.medium_threshold {
            BudgetBand::Low
        } else if daily_budget < self.high_threshold {
            BudgetBand::Medium
        } else {
            BudgetBand::High
        }
    }

    /// Templates a band draws from, in catalog order.
    pub fn pool_for(&self, band: BudgetBand) -> Vec<&'static ActivityTemplate> {
        let slices = match band {
            BudgetBand::Low => &self.low_pool,
            BudgetBand::Medium => &self.medium_pool,
            BudgetBand::High => &self.high_pool,
        };
        slices.iter().flat_map(|s| s.templates().iter()).collect()
    }

    /// Compute the daily budget and select the template pool.
    ///
    /// Never yields a pool for invalid input.
    pub fn allocate(&self, total_budget: f64, days: i64) -> Result<Allocation, AllocationError> {
        if days < 1 {
            return Err(AllocationError::InvalidDays(days));
        }
        if days > MAX_TRIP_DAYS {
            return Err(AllocationError::TooManyDays {
                days,
                max: MAX_TRIP_DAYS,
            });
        }
        if !total_budget.is_finite() || total_budget <= 0.0 {
            return Err(AllocationError::InvalidBudget(total_budget));
        }

        let daily_budget = total_budget / days as f64;
        let band = self.band_for(daily_budget);
        let pool = self.pool_for(band);
        if pool.is_empty() {
            return Err(AllocationError::EmptyPool);
        }

        debug!(daily_budget, %band, pool_size = pool.len(), "selected template pool");
        Ok(Allocation {
            daily_budget,
            band,
            pool,
        })
    }
}

/// [`PoolPolicy::allocate`] with the default policy.
pub fn allocate(total_budget: f64, days: i64) -> Result<Allocation, AllocationError> {
    PoolPolicy::default().allocate(total_budget, days)
}
