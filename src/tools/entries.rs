//! Entry MCP Tools
//!
//! Recording, editing and listing sessions, plus the daily aggregate view.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::Database;
use crate::metrics::{aggregate_by_date, aggregate_entries, DailyAggregate};
use crate::models::{Account, Entry, EntryCreate, EntryFilter, EntryUpdate};

/// Response for list_entries
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    /// Account the listing is scoped to; `None` means all accounts
    pub account_id: Option<String>,
    /// True when same-day entries were merged
    pub aggregated: bool,
    pub entries: Vec<Entry>,
    pub total: usize,
}

/// Response for get_daily_aggregates
#[derive(Debug, Serialize)]
pub struct DailyAggregatesResponse {
    pub account_id: Option<String>,
    pub days: Vec<DailyAggregate>,
    pub total_days: usize,
}

/// Pick the account a query applies to: the explicit one, else the active one.
///
/// `None` when neither exists, meaning "all accounts".
pub(crate) fn resolve_account(
    conn: &Connection,
    owner: &str,
    account_id: Option<&str>,
) -> Result<Option<Account>, String> {
    match account_id {
        Some(id) => Account::get(conn, owner, id)
            .map_err(|e| format!("Database error: {}", e))?
            .map(Some)
            .ok_or_else(|| format!("Account '{}' not found", id)),
        None => Account::active(conn, owner).map_err(|e| format!("Database error: {}", e)),
    }
}

/// Entries for the resolved account, optionally merged per day (newest first)
pub(crate) fn load_entries(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
) -> Result<(Option<Account>, Vec<Entry>), String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let account = resolve_account(&conn, owner, account_id)?;
    let entries = Entry::list(&conn, owner, account.as_ref().map(|a| a.account_id.as_str()), filter)
        .map_err(|e| format!("Failed to list entries: {}", e))?;

    if daily {
        Ok((account, aggregate_entries(&entries)))
    } else {
        Ok((account, entries))
    }
}

/// Record a session for an existing account
pub fn create_entry(db: &Database, owner: &str, data: EntryCreate) -> Result<Entry, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let account = Account::get(&conn, owner, &data.account_id)
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Account '{}' not found", data.account_id))?;

    let entry = Entry::create(&conn, owner, &account.account_name, &data)
        .map_err(|e| format!("Failed to create entry: {}", e))?;

    tracing::info!(entry_id = entry.id, account_id = %entry.account_id, date = %entry.date, "Created entry");
    Ok(entry)
}

pub fn get_entry(db: &Database, owner: &str, id: i64) -> Result<Option<Entry>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Entry::get_by_id(&conn, owner, id).map_err(|e| format!("Failed to get entry: {}", e))
}

pub fn list_entries(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
    limit: Option<usize>,
) -> Result<ListEntriesResponse, String> {
    let (account, mut entries) = load_entries(db, owner, account_id, filter, daily)?;
    let total = entries.len();

    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    Ok(ListEntriesResponse {
        account_id: account.map(|a| a.account_id),
        aggregated: daily,
        entries,
        total,
    })
}

/// Partial update; derived metrics are recomputed
pub fn update_entry(db: &Database, owner: &str, id: i64, data: &EntryUpdate) -> Result<Option<Entry>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Entry::update(&conn, owner, id, data)
        .map_err(|e| format!("Failed to update entry: {}", e))?;

    if updated.is_some() {
        tracing::info!(entry_id = id, "Updated entry");
    }
    Ok(updated)
}

pub fn delete_entry(db: &Database, owner: &str, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = Entry::delete(&conn, owner, id).map_err(|e| format!("Failed to delete entry: {}", e))?;
    if deleted {
        tracing::info!(entry_id = id, "Deleted entry");
    }
    Ok(deleted)
}

/// Merged days with their sub-entries
pub fn get_daily_aggregates(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
) -> Result<DailyAggregatesResponse, String> {
    let (account, entries) = load_entries(db, owner, account_id, filter, false)?;
    let days = aggregate_by_date(&entries);

    Ok(DailyAggregatesResponse {
        account_id: account.map(|a| a.account_id),
        total_days: days.len(),
        days,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::{seeded, session};
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::tools::accounts;

    #[test]
    fn test_create_requires_account() {
        let (_dir, db) = temp_db();
        let err = create_entry(&db, "local", session("ghost", "2024-01-01", (0, 1), (0, 1))).unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_list_defaults_to_active_account() {
        let (_dir, db) = temp_db();
        seeded(&db);
        accounts::create_account(&db, "local", "Side", "side", false).unwrap();
        create_entry(&db, "local", session("side", "2024-01-05", (0, 3), (0, 3))).unwrap();

        let listed = list_entries(&db, "local", None, &EntryFilter::default(), false, None).unwrap();
        assert_eq!(listed.account_id.as_deref(), Some("main"));
        assert_eq!(listed.total, 3);

        let side = list_entries(&db, "local", Some("side"), &EntryFilter::default(), false, None).unwrap();
        assert_eq!(side.total, 1);
    }

    #[test]
    fn test_daily_listing_merges_same_day() {
        let (_dir, db) = temp_db();
        seeded(&db);

        let listed = list_entries(&db, "local", None, &EntryFilter::default(), true, Some(1)).unwrap();
        assert!(listed.aggregated);
        assert_eq!(listed.total, 2);
        assert_eq!(listed.entries.len(), 1);
        assert_eq!(listed.entries[0].date, "2024-01-02");

        let days = get_daily_aggregates(&db, "local", None, &EntryFilter::default()).unwrap();
        assert_eq!(days.total_days, 2);
        let jan1 = &days.days[1];
        assert_eq!(jan1.record_count, 2);
        assert_eq!(jan1.metrics.follower_growth, 15);
        assert_eq!(jan1.metrics.follow_back_rate, 125.0);
    }

    #[test]
    fn test_update_and_delete() {
        let (_dir, db) = temp_db();
        seeded(&db);
        let first = list_entries(&db, "local", None, &EntryFilter::default(), false, None)
            .unwrap()
            .entries[0]
            .clone();

        let updated = update_entry(
            &db,
            "local",
            first.id,
            &EntryUpdate {
                followers_after: Some(120),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.metrics.follower_growth, 5);

        assert!(delete_entry(&db, "local", first.id).unwrap());
        assert!(get_entry(&db, "local", first.id).unwrap().is_none());
        assert!(!delete_entry(&db, "local", first.id).unwrap());
        assert!(update_entry(&db, "local", first.id, &EntryUpdate::default()).unwrap().is_none());
    }
}
