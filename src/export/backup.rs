//! Full-store backup and restore
//!
//! A backup holds every account and entry of one owner plus the active
//! account pointer. Restoring skips accounts that already exist and entries
//! already present (same account and creation timestamp), so importing the
//! same file twice is harmless.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::db::DbResult;
use crate::models::{Account, AccountCreate, Entry, EntryCreate, EntryFilter, Preferences};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub exported_at: String,
    pub active_account_id: Option<String>,
    pub accounts: Vec<Account>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub accounts_created: usize,
    pub accounts_skipped: usize,
    pub entries_imported: usize,
    pub entries_skipped: usize,
    pub active_account_id: Option<String>,
}

impl Backup {
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshot everything the owner has
pub fn export_all(conn: &Connection, owner: &str, exported_at: &str) -> DbResult<Backup> {
    Ok(Backup {
        exported_at: exported_at.to_string(),
        active_account_id: Preferences::get(conn, owner)?.active_account_id,
        accounts: Account::list(conn, owner)?,
        entries: Entry::list(conn, owner, None, &EntryFilter::default())?,
    })
}

fn entry_exists(conn: &Connection, owner: &str, account_id: &str, created_at: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE owner_id = ?1 AND account_id = ?2 AND created_at = ?3",
        params![owner, account_id, created_at],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn as_create(entry: &Entry) -> EntryCreate {
    EntryCreate {
        account_id: entry.account_id.clone(),
        date: entry.date.clone(),
        start_time: entry.start_time.clone(),
        counters: entry.counters,
        likes: entry.likes,
        main_loop_count: entry.main_loop_count,
        operation_time_minutes: entry.operation_time_minutes,
        note: entry.note.clone(),
    }
}

/// Restore a backup into the owner's store in one transaction.
///
/// Derived metrics are recomputed; values in the file are ignored. The
/// backup's active account is applied only when none is set yet.
pub fn import(conn: &mut Connection, owner: &str, backup: &Backup) -> DbResult<ImportSummary> {
    let tx = conn.transaction()?;
    let mut summary = ImportSummary::default();

    for account in &backup.accounts {
        if Account::get(&tx, owner, &account.account_id)?.is_some() {
            summary.accounts_skipped += 1;
            continue;
        }
        Account::create(
            &tx,
            owner,
            &AccountCreate {
                account_name: account.account_name.clone(),
                account_id: account.account_id.clone(),
            },
        )?;
        summary.accounts_created += 1;
    }

    // Oldest first so restored ids follow the backup creation order
    let mut entries: Vec<&Entry> = backup.entries.iter().collect();
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    for entry in entries {
        let account = match Account::get(&tx, owner, &entry.account_id)? {
            Some(a) => a,
            None => {
                tracing::warn!(entry_id = entry.id, account_id = %entry.account_id, "Skipping entry for unknown account");
                summary.entries_skipped += 1;
                continue;
            }
        };

        if entry_exists(&tx, owner, &entry.account_id, &entry.created_at)? {
            summary.entries_skipped += 1;
            continue;
        }

        Entry::insert(&tx, owner, &account.account_name, &as_create(entry), &entry.created_at)?;
        summary.entries_imported += 1;
    }

    let mut active = Preferences::get(&tx, owner)?.active_account_id;
    if active.is_none() {
        if let Some(ref wanted) = backup.active_account_id {
            if Account::get(&tx, owner, wanted)?.is_some() {
                Preferences::set_active(&tx, owner, Some(wanted))?;
                active = Some(wanted.clone());
            }
        }
    }
    summary.active_account_id = active;

    tx.commit()?;

    tracing::info!(
        accounts_created = summary.accounts_created,
        entries_imported = summary.entries_imported,
        entries_skipped = summary.entries_skipped,
        "Imported backup"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::metrics::Counters;

    fn seed(conn: &Connection) {
        for id in ["alpha", "beta"] {
            Account::create(
                conn,
                "local",
                &AccountCreate {
                    account_name: format!("Name of {}", id),
                    account_id: id.to_string(),
                },
            )
            .unwrap();
        }
        Preferences::set_active(conn, "local", Some("beta")).unwrap();

        for (account, date, after) in [("alpha", "2024-01-01", 110), ("alpha", "2024-01-02", 125), ("beta", "2024-01-01", 60)] {
            let data = EntryCreate {
                account_id: account.to_string(),
                date: date.to_string(),
                start_time: None,
                counters: Counters {
                    followers_before: 100,
                    followers_after: after,
                    following_before: 10,
                    following_after: 20,
                    ..Default::default()
                },
                likes: 5,
                main_loop_count: 1,
                operation_time_minutes: 30,
                note: Some("restored".to_string()),
            };
            Entry::create(conn, "local", &format!("Name of {}", account), &data).unwrap();
        }
    }

    #[test]
    fn test_round_trip_into_empty_store() {
        let (_dir, source) = temp_db();
        let backup = source
            .with_conn(|conn| {
                seed(conn);
                export_all(conn, "local", "2024-02-01T00:00:00Z")
            })
            .unwrap();
        assert_eq!(backup.accounts.len(), 2);
        assert_eq!(backup.entries.len(), 3);

        let json = backup.to_json().unwrap();
        let parsed = Backup::from_json(&json).unwrap();

        let (_dir2, target) = temp_db();
        let summary = target.with_conn_mut(|conn| import(conn, "local", &parsed)).unwrap();
        assert_eq!(summary.accounts_created, 2);
        assert_eq!(summary.entries_imported, 3);
        assert_eq!(summary.active_account_id.as_deref(), Some("beta"));

        let restored = target
            .with_conn(|conn| Entry::list(conn, "local", Some("alpha"), &EntryFilter::default()))
            .unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].metrics.follower_growth, 25);
        assert_eq!(restored[0].created_at, backup.entries.iter().find(|e| e.date == "2024-01-02").unwrap().created_at);
    }

    #[test]
    fn test_reimport_skips_existing() {
        let (_dir, db) = temp_db();
        let backup = db
            .with_conn(|conn| {
                seed(conn);
                export_all(conn, "local", "now")
            })
            .unwrap();

        let summary = db.with_conn_mut(|conn| import(conn, "local", &backup)).unwrap();
        assert_eq!(summary.accounts_skipped, 2);
        assert_eq!(summary.entries_imported, 0);
        assert_eq!(summary.entries_skipped, 3);
        assert_eq!(db.with_conn(|conn| Entry::count(conn, "local", None)).unwrap(), 3);
    }

    #[test]
    fn test_recomputes_derived_metrics() {
        let (_dir, db) = temp_db();
        let mut backup = db
            .with_conn(|conn| {
                seed(conn);
                export_all(conn, "local", "now")
            })
            .unwrap();
        for e in &mut backup.entries {
            e.metrics.follower_growth = 9999;
            e.metrics.follow_back_rate = 1.0;
        }

        let (_dir2, target) = temp_db();
        target.with_conn_mut(|conn| import(conn, "local", &backup)).unwrap();
        let entries = target
            .with_conn(|conn| Entry::list(conn, "local", Some("beta"), &EntryFilter::default()))
            .unwrap();
        assert_eq!(entries[0].metrics.follower_growth, -40);
        assert_eq!(entries[0].metrics.follow_back_rate, -400.0);
    }

    #[test]
    fn test_entries_without_account_are_skipped() {
        let (_dir, db) = temp_db();
        let mut backup = db
            .with_conn(|conn| {
                seed(conn);
                export_all(conn, "local", "now")
            })
            .unwrap();
        backup.accounts.retain(|a| a.account_id == "beta");

        let (_dir2, target) = temp_db();
        let summary = target.with_conn_mut(|conn| import(conn, "local", &backup)).unwrap();
        assert_eq!(summary.accounts_created, 1);
        assert_eq!(summary.entries_imported, 1);
        assert_eq!(summary.entries_skipped, 2);
    }
}
