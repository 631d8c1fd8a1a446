//! Daily aggregation
//!
//! Merges all entries of one account sharing a date into one daily summary.
//! Entries of different accounts are never merged. Growth is the
//! net change across the whole day (first `before` to last `after`), not the
//! sum of per-session deltas.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{total, Counters, GrowthMetrics};
use crate::models::Entry;

/// All entries of one account on one calendar date merged together
#[derive(Debug, Clone, Serialize)]
pub struct DailyAggregate {
    pub date: String,
    pub record_count: usize,
    /// `before` values from the first entry, `after` values from the last
    #[serde(flatten)]
    pub counters: Counters,
    pub likes: i64,
    pub main_loop_count: i64,
    pub operation_time_minutes: i64,
    #[serde(flatten)]
    pub metrics: GrowthMetrics,
    pub account_name: String,
    pub account_id: String,
    /// Sub-entries in creation order
    pub entries: Vec<Entry>,
}

impl DailyAggregate {
    /// Merge one date's entries; `None` for an empty bucket
    fn from_bucket(date: String, mut entries: Vec<Entry>) -> Option<Self> {
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let first = entries.first()?;
        let last = entries.last()?;

        let counters = Counters {
            posts_before: first.counters.posts_before,
            followers_before: first.counters.followers_before,
            following_before: first.counters.following_before,
            posts_after: last.counters.posts_after,
            followers_after: last.counters.followers_after,
            following_after: last.counters.following_after,
        };

        Some(Self {
            date,
            record_count: entries.len(),
            counters,
            likes: total(entries.iter().map(|e| e.likes)),
            main_loop_count: total(entries.iter().map(|e| e.main_loop_count)),
            operation_time_minutes: total(entries.iter().map(|e| e.operation_time_minutes)),
            metrics: GrowthMetrics::from_counters(&counters),
            account_name: first.account_name.clone(),
            account_id: first.account_id.clone(),
            entries,
        })
    }
}

/// Group entries by account and exact date string and merge each group.
///
/// Output is sorted by date, most recent first, then by account id.
pub fn aggregate_by_date(entries: &[Entry]) -> Vec<DailyAggregate> {
    let mut buckets: BTreeMap<(String, String), Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        buckets
            .entry((entry.date.clone(), entry.account_id.clone()))
            .or_default()
            .push(entry.clone());
    }

    let mut days: Vec<DailyAggregate> = buckets
        .into_iter()
        .filter_map(|((date, _), bucket)| DailyAggregate::from_bucket(date, bucket))
        .collect();
    // Stable, so accounts stay in ascending order within a date
    days.sort_by(|a, b| b.date.cmp(&a.date));
    days
}

/// Synthetic ID for an aggregated day: the date's digits, negated.
///
/// Stored IDs are positive, so these never collide with real entries. Days
/// of different accounts on the same date share an ID.
pub fn synthetic_id(date: &str) -> i64 {
    let digits: String = date.chars().filter(|c| c.is_ascii_digit()).take(18).collect();
    digits.parse::<i64>().map(|n| -n).unwrap_or(0)
}

/// Re-express a daily aggregate as an [`Entry`] so entry-based statistics
/// can run over aggregated data unchanged.
pub fn aggregate_to_entry(aggregate: &DailyAggregate) -> Entry {
    let first = aggregate.entries.first();
    let last = aggregate.entries.last();

    Entry {
        id: synthetic_id(&aggregate.date),
        date: aggregate.date.clone(),
        start_time: first.and_then(|e| e.start_time.clone()),
        counters: aggregate.counters,
        likes: aggregate.likes,
        main_loop_count: aggregate.main_loop_count,
        operation_time_minutes: aggregate.operation_time_minutes,
        metrics: aggregate.metrics,
        note: Some(format!("Aggregated from {} entries", aggregate.record_count)),
        account_name: aggregate.account_name.clone(),
        account_id: aggregate.account_id.clone(),
        created_at: first.map(|e| e.created_at.clone()).unwrap_or_default(),
        updated_at: last.map(|e| e.updated_at.clone()).unwrap_or_default(),
    }
}

/// Aggregate by date and convert each day back to an entry
pub fn aggregate_entries(entries: &[Entry]) -> Vec<Entry> {
    aggregate_by_date(entries).iter().map(aggregate_to_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::entry;

    #[test]
    fn test_same_day_entries_merge_first_before_last_after() {
        let entries = vec![
            entry(1, "2024-01-01", (100, 110), (50, 60)),
            entry(2, "2024-01-01", (110, 115), (60, 62)),
        ];

        let days = aggregate_by_date(&entries);
        assert_eq!(days.len(), 1);

        let day = &days[0];
        assert_eq!(day.record_count, 2);
        assert_eq!(day.counters.followers_before, 100);
        assert_eq!(day.counters.followers_after, 115);
        assert_eq!(day.counters.following_before, 50);
        assert_eq!(day.counters.following_after, 62);
        assert_eq!(day.metrics.follower_growth, 15);
        assert_eq!(day.metrics.following_growth, 12);
        assert_eq!(day.metrics.follow_back_rate, 125.0);
    }

    #[test]
    fn test_orders_by_creation_not_input_order() {
        // Later session passed first
        let mut late = entry(7, "2024-01-01", (110, 115), (60, 62));
        let mut early = entry(3, "2024-01-01", (100, 110), (50, 60));
        late.created_at = "2024-01-01T20:00:00.000000Z".to_string();
        early.created_at = "2024-01-01T08:00:00.000000Z".to_string();

        let day = &aggregate_by_date(&[late, early])[0];
        assert_eq!(day.counters.followers_before, 100);
        assert_eq!(day.counters.followers_after, 115);
        assert_eq!(day.entries[0].id, 3);
    }

    #[test]
    fn test_creation_timestamp_beats_id() {
        // Higher id but created earlier
        let mut a = entry(9, "2024-01-01", (200, 210), (0, 0));
        let mut b = entry(2, "2024-01-01", (210, 230), (0, 0));
        a.created_at = "2024-01-01T01:00:00.000000Z".to_string();
        b.created_at = "2024-01-01T02:00:00.000000Z".to_string();

        let day = &aggregate_by_date(&[b, a])[0];
        assert_eq!(day.counters.followers_before, 200);
        assert_eq!(day.counters.followers_after, 230);
    }

    #[test]
    fn test_sums_activity_counters() {
        let mut a = entry(1, "2024-02-10", (0, 1), (0, 0));
        let mut b = entry(2, "2024-02-10", (1, 2), (0, 0));
        a.likes = 40;
        a.main_loop_count = 2;
        a.operation_time_minutes = 30;
        b.likes = 25;
        b.main_loop_count = 1;
        b.operation_time_minutes = 15;

        let day = &aggregate_by_date(&[a, b])[0];
        assert_eq!(day.likes, 65);
        assert_eq!(day.main_loop_count, 3);
        assert_eq!(day.operation_time_minutes, 45);
    }

    #[test]
    fn test_accounts_on_same_date_stay_separate() {
        let mut big = entry(1, "2024-01-01", (1000, 1010), (0, 0));
        big.account_id = "big".to_string();
        let mut small = entry(2, "2024-01-01", (50, 55), (0, 0));
        small.account_id = "small".to_string();

        let days = aggregate_by_date(&[small, big]);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].account_id, "big");
        assert_eq!(days[0].metrics.follower_growth, 10);
        assert_eq!(days[1].account_id, "small");
        assert_eq!(days[1].metrics.follower_growth, 5);

        let merged = aggregate_entries(&days.iter().flat_map(|d| d.entries.clone()).collect::<Vec<_>>());
        assert_eq!(total(merged.iter().map(|e| e.metrics.follower_growth)), 15);
    }

    #[test]
    fn test_single_entry_bucket() {
        let e = entry(4, "2024-03-05", (10, 14), (5, 9));
        let day = &aggregate_by_date(&[e.clone()])[0];
        assert_eq!(day.record_count, 1);
        assert_eq!(day.counters, e.counters);
        assert_eq!(day.metrics, e.metrics);
    }

    #[test]
    fn test_output_sorted_newest_first() {
        let entries = vec![
            entry(1, "2024-01-02", (0, 1), (0, 0)),
            entry(2, "2024-01-10", (0, 1), (0, 0)),
            entry(3, "2023-12-31", (0, 1), (0, 0)),
        ];
        let dates: Vec<String> = aggregate_by_date(&entries).into_iter().map(|d| d.date).collect();
        assert_eq!(dates, vec!["2024-01-10", "2024-01-02", "2023-12-31"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_by_date(&[]).is_empty());
        assert!(aggregate_entries(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_to_entry_matches_aggregate() {
        let mut first = entry(1, "2024-01-05", (100, 110), (50, 60));
        first.start_time = Some("09:15".to_string());
        let second = entry(2, "2024-01-05", (110, 115), (60, 62));

        let day = &aggregate_by_date(&[first, second])[0];
        let synthetic = aggregate_to_entry(day);

        assert_eq!(synthetic.id, -20240105);
        assert_eq!(synthetic.counters, day.counters);
        assert_eq!(synthetic.metrics, day.metrics);
        assert_eq!(synthetic.likes, day.likes);
        assert_eq!(synthetic.start_time.as_deref(), Some("09:15"));
        assert_eq!(synthetic.note.as_deref(), Some("Aggregated from 2 entries"));
    }

    #[test]
    fn test_reaggregating_a_day_is_stable() {
        let entries = vec![
            entry(1, "2024-01-01", (100, 110), (50, 60)),
            entry(2, "2024-01-01", (110, 115), (60, 62)),
        ];
        let day = aggregate_by_date(&entries).remove(0);

        let again = aggregate_by_date(&[aggregate_to_entry(&day)]).remove(0);
        assert_eq!(again.date, day.date);
        assert_eq!(again.counters, day.counters);
        assert_eq!(again.metrics, day.metrics);
        assert_eq!(again.likes, day.likes);
        assert_eq!(again.main_loop_count, day.main_loop_count);
        assert_eq!(again.operation_time_minutes, day.operation_time_minutes);
        assert_eq!(again.account_id, day.account_id);
    }

    #[test]
    fn test_synthetic_id() {
        assert_eq!(synthetic_id("2024-01-05"), -20240105);
        assert_eq!(synthetic_id("no digits"), 0);
    }
}
