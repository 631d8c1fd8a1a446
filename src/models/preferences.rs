//! Preferences model
//!
//! Per-owner singleton record. Holds the active account pointer.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{now_timestamp, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub owner_id: String,
    pub active_account_id: Option<String>,
    pub updated_at: Option<String>,
}

impl Preferences {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            owner_id: row.get("owner_id")?,
            active_account_id: row.get("active_account_id")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Get preferences, or empty defaults if never written
    pub fn get(conn: &Connection, owner: &str) -> DbResult<Self> {
        let mut stmt = conn.prepare("SELECT * FROM preferences WHERE owner_id = ?1")?;

        let result = stmt.query_row(params![owner], Self::from_row);
        match result {
            Ok(prefs) => Ok(prefs),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Self {
                owner_id: owner.to_string(),
                active_account_id: None,
                updated_at: None,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Point the owner's active account somewhere else (or nowhere)
    pub fn set_active(conn: &Connection, owner: &str, account_id: Option<&str>) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO preferences (owner_id, active_account_id, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(owner_id) DO UPDATE SET
                active_account_id = excluded.active_account_id,
                updated_at = excluded.updated_at
            "#,
            params![owner, account_id, now_timestamp()],
        )?;

        Self::get(conn, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;

    #[test]
    fn test_defaults_then_upsert() {
        let (_dir, db) = temp_db();
        let conn = db.get_conn().unwrap();

        let prefs = Preferences::get(&conn, "local").unwrap();
        assert_eq!(prefs.active_account_id, None);

        Preferences::set_active(&conn, "local", Some("alpha")).unwrap();
        let prefs = Preferences::set_active(&conn, "local", Some("beta")).unwrap();
        assert_eq!(prefs.active_account_id.as_deref(), Some("beta"));

        // Other owners are unaffected
        assert_eq!(Preferences::get(&conn, "other").unwrap().active_account_id, None);
    }
}
