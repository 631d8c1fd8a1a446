//! Summary statistics
//!
//! Overall summary, weekly/monthly rollups and the two-half growth trend.
//! None of these fail on empty input; they return zero or neutral values.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{average_positive_rate, round2, total};
use crate::models::Entry;

pub const TREND_INSUFFICIENT: &str = "insufficient data";
pub const TREND_MARKEDLY_IMPROVING: &str = "markedly improving";
pub const TREND_MILDLY_IMPROVING: &str = "mildly improving";
pub const TREND_MILDLY_DECLINING: &str = "mildly declining";
pub const TREND_MARKEDLY_DECLINING: &str = "markedly declining";

/// Whole-series summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_records: usize,
    pub total_operation_time: i64,
    pub total_likes: i64,
    pub total_follower_growth: i64,
    pub total_following_growth: i64,
    pub average_follower_growth: f64,
    /// Mean over entries with a strictly positive rate only
    pub average_follow_back_rate: f64,
    pub best_performance_date: String,
    pub worst_performance_date: String,
}

/// Rollup bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Week,
    Month,
}

impl Granularity {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "week" | "weekly" => Some(Granularity::Week),
            "month" | "monthly" => Some(Granularity::Month),
            _ => None,
        }
    }

    /// First and last day of the bucket containing `date`.
    ///
    /// Weeks run Sunday to Saturday.
    pub fn bounds(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Granularity::Week => {
                let start = date - Duration::days(date.weekday().num_days_from_sunday() as i64);
                (start, start + Duration::days(6))
            }
            Granularity::Month => {
                let start = date.with_day(1).unwrap_or(date);
                let next = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next.map(|n| n - Duration::days(1)).unwrap_or(start);
                (start, end)
            }
        }
    }

    fn label(&self, start: NaiveDate) -> String {
        match self {
            Granularity::Week => start.format("%Y-%m-%d").to_string(),
            Granularity::Month => start.format("%Y-%m").to_string(),
        }
    }
}

/// One weekly or monthly bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub granularity: Granularity,
    pub label: String,
    pub period_start: String,
    pub period_end: String,
    pub record_count: usize,
    pub total_follower_growth: i64,
    pub total_following_growth: i64,
    pub total_operation_time: i64,
    pub total_likes: i64,
    pub average_follow_back_rate: f64,
    /// Monthly rollups only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_average_growth: Option<f64>,
}

/// Two-half comparison of mean follower growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthTrend {
    pub is_positive: bool,
    /// Magnitude of the change, in percent of the first half's mean
    pub percentage: f64,
    pub description: String,
}

/// Summary over all entries
pub fn overall_statistics(entries: &[Entry]) -> Summary {
    if entries.is_empty() {
        return Summary::default();
    }

    let total_follower_growth: i64 = total(entries.iter().map(|e| e.metrics.follower_growth));

    // Best: first entry with the highest growth. Worst: last with the lowest.
    let mut best = &entries[0];
    let mut worst = &entries[0];
    for entry in entries {
        if entry.metrics.follower_growth > best.metrics.follower_growth {
            best = entry;
        }
        if entry.metrics.follower_growth <= worst.metrics.follower_growth {
            worst = entry;
        }
    }

    Summary {
        total_records: entries.len(),
        total_operation_time: total(entries.iter().map(|e| e.operation_time_minutes)),
        total_likes: total(entries.iter().map(|e| e.likes)),
        total_follower_growth,
        total_following_growth: total(entries.iter().map(|e| e.metrics.following_growth)),
        average_follower_growth: round2(total_follower_growth as f64 / entries.len() as f64),
        average_follow_back_rate: average_positive_rate(
            entries.iter().map(|e| e.metrics.follow_back_rate),
        ),
        best_performance_date: best.date.clone(),
        worst_performance_date: worst.date.clone(),
    }
}

/// Weekly or monthly rollups, newest bucket first.
///
/// Entries whose date does not parse as `YYYY-MM-DD` are skipped.
pub fn periodic_statistics(entries: &[Entry], granularity: Granularity) -> Vec<Rollup> {
    let mut buckets: BTreeMap<NaiveDate, (NaiveDate, Vec<&Entry>)> = BTreeMap::new();

    for entry in entries {
        let date = match NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                tracing::warn!(entry_id = entry.id, date = %entry.date, "Skipping entry with unparseable date");
                continue;
            }
        };
        let (start, end) = granularity.bounds(date);
        buckets.entry(start).or_insert_with(|| (end, Vec::new())).1.push(entry);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(start, (end, bucket))| {
            let record_count = bucket.len();
            let total_follower_growth: i64 = total(bucket.iter().map(|e| e.metrics.follower_growth));

            let daily_average_growth = match granularity {
                Granularity::Month => Some(round2(total_follower_growth as f64 / record_count as f64)),
                Granularity::Week => None,
            };

            Rollup {
                granularity,
                label: granularity.label(start),
                period_start: start.format("%Y-%m-%d").to_string(),
                period_end: end.format("%Y-%m-%d").to_string(),
                record_count,
                total_follower_growth,
                total_following_growth: total(bucket.iter().map(|e| e.metrics.following_growth)),
                total_operation_time: total(bucket.iter().map(|e| e.operation_time_minutes)),
                total_likes: total(bucket.iter().map(|e| e.likes)),
                average_follow_back_rate: average_positive_rate(
                    bucket.iter().map(|e| e.metrics.follow_back_rate),
                ),
                daily_average_growth,
            }
        })
        .collect()
}

fn mean_growth(entries: &[&Entry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    total(entries.iter().map(|e| e.metrics.follower_growth)) as f64 / entries.len() as f64
}

/// Compare mean follower growth of the later half against the earlier half.
///
/// For odd lengths the extra entry goes to the later half.
pub fn growth_trend(entries: &[Entry]) -> GrowthTrend {
    if entries.len() < 2 {
        return GrowthTrend {
            is_positive: true,
            percentage: 0.0,
            description: TREND_INSUFFICIENT.to_string(),
        };
    }

    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let (first_half, second_half) = sorted.split_at(sorted.len() / 2);
    let first_avg = mean_growth(first_half);
    let second_avg = mean_growth(second_half);

    let change = second_avg - first_avg;
    let signed = if first_avg != 0.0 {
        change / first_avg.abs() * 100.0
    } else {
        0.0
    };

    let description = if signed > 10.0 {
        TREND_MARKEDLY_IMPROVING
    } else if signed > 0.0 {
        TREND_MILDLY_IMPROVING
    } else if signed > -10.0 {
        TREND_MILDLY_DECLINING
    } else {
        TREND_MARKEDLY_DECLINING
    };

    GrowthTrend {
        is_positive: change >= 0.0,
        percentage: round2(signed.abs()),
        description: description.to_string(),
    }
}
