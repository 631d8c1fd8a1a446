//! Statistics MCP Tools

use serde::Serialize;

use super::entries::load_entries;
use crate::db::Database;
use crate::metrics::{growth_trend, overall_statistics, periodic_statistics, Granularity, GrowthTrend, Rollup, Summary};
use crate::models::EntryFilter;

/// Response for get_statistics
#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub account_id: Option<String>,
    pub aggregated: bool,
    pub summary: Summary,
    pub trend: GrowthTrend,
}

/// Response for get_periodic_statistics
#[derive(Debug, Serialize)]
pub struct PeriodicStatisticsResponse {
    pub account_id: Option<String>,
    pub aggregated: bool,
    pub granularity: Granularity,
    pub periods: Vec<Rollup>,
}

pub fn get_statistics(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
) -> Result<StatisticsResponse, String> {
    let (account, entries) = load_entries(db, owner, account_id, filter, daily)?;

    Ok(StatisticsResponse {
        account_id: account.map(|a| a.account_id),
        aggregated: daily,
        summary: overall_statistics(&entries),
        trend: growth_trend(&entries),
    })
}

pub fn get_periodic_statistics(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    granularity: &str,
    daily: bool,
) -> Result<PeriodicStatisticsResponse, String> {
    let granularity = Granularity::from_str(granularity)
        .ok_or_else(|| format!("Invalid granularity '{}'. Use 'week' or 'month'", granularity))?;

    let (account, entries) = load_entries(db, owner, account_id, filter, daily)?;

    Ok(PeriodicStatisticsResponse {
        account_id: account.map(|a| a.account_id),
        aggregated: daily,
        granularity,
        periods: periodic_statistics(&entries, granularity),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::tools::accounts::create_account;
    use crate::tools::entries::create_entry;
    use crate::tools::entries::test_support::{seeded, session};

    #[test]
    fn test_statistics_raw_vs_daily() {
        let (_dir, db) = temp_db();
        seeded(&db);

        let raw = get_statistics(&db, "local", None, &EntryFilter::default(), false).unwrap();
        assert_eq!(raw.summary.total_records, 3);
        assert_eq!(raw.summary.total_follower_growth, 35);

        let daily = get_statistics(&db, "local", None, &EntryFilter::default(), true).unwrap();
        assert!(daily.aggregated);
        assert_eq!(daily.summary.total_records, 2);
        assert_eq!(daily.summary.total_follower_growth, 35);
        assert_eq!(daily.summary.best_performance_date, "2024-01-02");
        // Day growth 15 then 20
        assert_eq!(daily.trend.percentage, 33.33);
        assert_eq!(daily.trend.description, "markedly improving");
    }

    #[test]
    fn test_daily_statistics_across_accounts_without_active() {
        let (_dir, db) = temp_db();
        create_account(&db, "local", "Big", "big", false).unwrap();
        create_account(&db, "local", "Small", "small", false).unwrap();
        create_entry(&db, "local", session("big", "2024-01-01", (1000, 1010), (0, 0))).unwrap();
        create_entry(&db, "local", session("small", "2024-01-01", (50, 55), (0, 0))).unwrap();

        let daily = get_statistics(&db, "local", None, &EntryFilter::default(), true).unwrap();
        assert_eq!(daily.account_id, None);
        assert_eq!(daily.summary.total_records, 2);
        assert_eq!(daily.summary.total_follower_growth, 15);
        assert_eq!(daily.summary.best_performance_date, "2024-01-01");
    }

    #[test]
    fn test_periodic_statistics() {
        let (_dir, db) = temp_db();
        seeded(&db);

        let months = get_periodic_statistics(&db, "local", None, &EntryFilter::default(), "month", false).unwrap();
        assert_eq!(months.periods.len(), 1);
        assert_eq!(months.periods[0].label, "2024-01");
        assert_eq!(months.periods[0].record_count, 3);

        assert!(get_periodic_statistics(&db, "local", None, &EntryFilter::default(), "year", false).is_err());
    }

    #[test]
    fn test_empty_store_statistics() {
        let (_dir, db) = temp_db();
        let stats = get_statistics(&db, "local", None, &EntryFilter::default(), true).unwrap();
        assert_eq!(stats.account_id, None);
        assert_eq!(stats.summary, Summary::default());
        assert_eq!(stats.trend.description, "insufficient data");
    }
}
