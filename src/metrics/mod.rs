//! Growth metrics
//!
//! Derived per-entry metrics, daily aggregation and summary statistics.
//! Everything here is pure computation over slices of entries.

pub mod aggregation;
pub mod statistics;

use serde::{Deserialize, Serialize};

pub use aggregation::{aggregate_by_date, aggregate_entries, aggregate_to_entry, DailyAggregate};
pub use statistics::{
    growth_trend, overall_statistics, periodic_statistics, Granularity, GrowthTrend, Rollup,
    Summary,
};

/// Round to two decimal places, halves toward positive infinity
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Before/after counters of one session (or one merged day)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub posts_before: i64,
    pub posts_after: i64,
    pub followers_before: i64,
    pub followers_after: i64,
    pub following_before: i64,
    pub following_after: i64,
}

/// Values derived from [`Counters`]; never set independently
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub follower_growth: i64,
    pub following_growth: i64,
    pub post_growth: i64,
    /// Percentage of new follows that turned into new followers
    pub follow_back_rate: f64,
}

impl GrowthMetrics {
    pub fn from_counters(c: &Counters) -> Self {
        let follower_growth = c.followers_after - c.followers_before;
        let following_growth = c.following_after - c.following_before;
        let post_growth = c.posts_after - c.posts_before;

        Self {
            follower_growth,
            following_growth,
            post_growth,
            follow_back_rate: follow_back_rate(follower_growth, following_growth),
        }
    }
}

/// `follower_growth / following_growth * 100` rounded, or 0 without new follows
pub fn follow_back_rate(follower_growth: i64, following_growth: i64) -> f64 {
    if following_growth > 0 {
        round2(follower_growth as f64 / following_growth as f64 * 100.0)
    } else {
        0.0
    }
}

/// Saturating sum of counter values
pub(crate) fn total<I>(values: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    values.into_iter().fold(0, i64::saturating_add)
}

/// Mean of the strictly positive rates, rounded; 0 when there are none
pub(crate) fn average_positive_rate<I>(rates: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = rates
        .into_iter()
        .filter(|r| *r > 0.0)
        .fold((0.0, 0usize), |(s, n), r| (s + r, n + 1));

    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}
