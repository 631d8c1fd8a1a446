//! Account model
//!
//! A tracked Instagram identity. Whether an account is active is read from
//! the owner's [`Preferences`] record, so at most one is active per owner.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{Entry, Preferences};
use crate::db::{now_timestamp, DbError, DbResult};

/// A tracked account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub account_id: String,
    pub account_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreate {
    pub account_name: String,
    pub account_id: String,
}

/// Data for updating an account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub account_name: Option<String>,
}

/// Result of deleting an account and its entries
#[derive(Debug, Clone, Serialize)]
pub struct AccountDeletion {
    pub account_id: String,
    pub entries_deleted: usize,
    /// Active account after the delete (may have fallen to another one)
    pub active_account_id: Option<String>,
}

const SELECT_ACCOUNTS: &str = r#"
    SELECT a.*,
           CASE WHEN p.active_account_id = a.account_id THEN 1 ELSE 0 END AS is_active
    FROM accounts a
    LEFT JOIN preferences p ON p.owner_id = a.owner_id
"#;

impl AccountCreate {
    pub fn validate(&self) -> DbResult<()> {
        if self.account_id.trim().is_empty() {
            return Err(DbError::InvalidInput("account_id must not be empty".to_string()));
        }
        if self.account_name.trim().is_empty() {
            return Err(DbError::InvalidInput("account_name must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Account {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            account_name: row.get("account_name")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create an account (does not change which account is active)
    pub fn create(conn: &Connection, owner: &str, data: &AccountCreate) -> DbResult<Self> {
        data.validate()?;

        if Self::get(conn, owner, &data.account_id)?.is_some() {
            return Err(DbError::InvalidInput(format!(
                "account '{}' already exists",
                data.account_id
            )));
        }

        let now = now_timestamp();
        conn.execute(
            r#"
            INSERT INTO accounts (owner_id, account_id, account_name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![owner, data.account_id.trim(), data.account_name.trim(), now],
        )?;

        Self::get(conn, owner, data.account_id.trim())?
            .ok_or_else(|| DbError::NotFound(format!("Account {}", data.account_id)))
    }

    /// Get an account by its external ID
    pub fn get(conn: &Connection, owner: &str, account_id: &str) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE a.owner_id = ?1 AND a.account_id = ?2", SELECT_ACCOUNTS);
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt.query_row(params![owner, account_id], Self::from_row);
        match result {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List accounts in load order (newest first)
    pub fn list(conn: &Connection, owner: &str) -> DbResult<Vec<Self>> {
        let sql = format!(
            "{} WHERE a.owner_id = ?1 ORDER BY a.created_at DESC, a.id DESC",
            SELECT_ACCOUNTS
        );
        let mut stmt = conn.prepare(&sql)?;

        let accounts = stmt
            .query_map(params![owner], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get the active account, if any
    pub fn active(conn: &Connection, owner: &str) -> DbResult<Option<Self>> {
        match Preferences::get(conn, owner)?.active_account_id {
            Some(account_id) => Self::get(conn, owner, &account_id),
            None => Ok(None),
        }
    }

    /// Rename an account; entries carry the new name too
    pub fn update(
        conn: &Connection,
        owner: &str,
        account_id: &str,
        data: &AccountUpdate,
    ) -> DbResult<Option<Self>> {
        if Self::get(conn, owner, account_id)?.is_none() {
            return Ok(None);
        }

        if let Some(ref name) = data.account_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DbError::InvalidInput("account_name must not be empty".to_string()));
            }
            conn.execute(
                "UPDATE accounts SET account_name = ?1, updated_at = ?2 WHERE owner_id = ?3 AND account_id = ?4",
                params![name, now_timestamp(), owner, account_id],
            )?;
            Entry::rename_account(conn, owner, account_id, name)?;
        }

        Self::get(conn, owner, account_id)
    }

    /// Delete an account together with all of its entries.
    ///
    /// If it was the active account, activation falls to the first remaining
    /// account in load order, or to none.
    pub fn delete(conn: &Connection, owner: &str, account_id: &str) -> DbResult<Option<AccountDeletion>> {
        let account = match Self::get(conn, owner, account_id)? {
            Some(a) => a,
            None => return Ok(None),
        };

        let entries_deleted = Entry::delete_for_account(conn, owner, account_id)?;
        conn.execute(
            "DELETE FROM accounts WHERE owner_id = ?1 AND account_id = ?2",
            params![owner, account_id],
        )?;

        let mut active_account_id = Preferences::get(conn, owner)?.active_account_id;
        if account.is_active {
            active_account_id = Self::list(conn, owner)?
                .into_iter()
                .next()
                .map(|a| a.account_id);
            Preferences::set_active(conn, owner, active_account_id.as_deref())?;
        }

        Ok(Some(AccountDeletion {
            account_id: account.account_id,
            entries_deleted,
            active_account_id,
        }))
    }

    /// Count accounts
    pub fn count(conn: &Connection, owner: &str) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE owner_id = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::metrics::Counters;
    use crate::models::{EntryCreate, EntryFilter};

    fn create(conn: &Connection, id: &str) -> Account {
        Account::create(
            conn,
            "local",
            &AccountCreate {
                account_name: format!("Name of {}", id),
                account_id: id.to_string(),
            },
        )
        .unwrap()
    }

    fn add_entry(conn: &Connection, account: &Account) {
        let data = EntryCreate {
            account_id: account.account_id.clone(),
            date: "2024-05-01".to_string(),
            start_time: None,
            counters: Counters {
                followers_before: 10,
                followers_after: 12,
                ..Default::default()
            },
            likes: 0,
            main_loop_count: 0,
            operation_time_minutes: 0,
            note: None,
        };
        Entry::create(conn, "local", &account.account_name, &data).unwrap();
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let (_dir, db) = temp_db();
        let conn = db.get_conn().unwrap();
        create(&conn, "alpha");

        let dup = Account::create(
            &conn,
            "local",
            &AccountCreate {
                account_name: "Other".to_string(),
                account_id: "alpha".to_string(),
            },
        );
        assert!(matches!(dup, Err(DbError::InvalidInput(_))));
    }

    #[test]
    fn test_delete_cascades_entries() {
        let (_dir, db) = temp_db();
        let conn = db.get_conn().unwrap();
        let alpha = create(&conn, "alpha");
        let beta = create(&conn, "beta");
        add_entry(&conn, &alpha);
        add_entry(&conn, &alpha);
        add_entry(&conn, &beta);

        let deletion = Account::delete(&conn, "local", "alpha").unwrap().unwrap();
        assert_eq!(deletion.entries_deleted, 2);

        let remaining = Entry::list(&conn, "local", None, &EntryFilter::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|e| e.account_id != "alpha"));
        assert!(Account::get(&conn, "local", "alpha").unwrap().is_none());
    }

    #[test]
    fn test_deleting_active_account_falls_back() {
        let (_dir, db) = temp_db();
        let conn = db.get_conn().unwrap();
        create(&conn, "alpha");
        create(&conn, "beta");
        Preferences::set_active(&conn, "local", Some("alpha")).unwrap();

        let deletion = Account::delete(&conn, "local", "alpha").unwrap().unwrap();
        assert_eq!(deletion.active_account_id.as_deref(), Some("beta"));
        assert!(Account::get(&conn, "local", "beta").unwrap().unwrap().is_active);

        let deletion = Account::delete(&conn, "local", "beta").unwrap().unwrap();
        assert_eq!(deletion.active_account_id, None);
        assert!(Account::active(&conn, "local").unwrap().is_none());
    }

    #[test]
    fn test_rename_propagates_to_entries() {
        let (_dir, db) = temp_db();
        let conn = db.get_conn().unwrap();
        let alpha = create(&conn, "alpha");
        add_entry(&conn, &alpha);

        Account::update(
            &conn,
            "local",
            "alpha",
            &AccountUpdate {
                account_name: Some("Renamed".to_string()),
            },
        )
        .unwrap()
        .unwrap();

        let entries = Entry::list(&conn, "local", Some("alpha"), &EntryFilter::default()).unwrap();
        assert_eq!(entries[0].account_name, "Renamed");
    }

    #[test]
    fn test_only_one_active_account() {
        let (_dir, db) = temp_db();
        let conn = db.get_conn().unwrap();
        create(&conn, "alpha");
        create(&conn, "beta");
        create(&conn, "gamma");

        Preferences::set_active(&conn, "local", Some("beta")).unwrap();
        Preferences::set_active(&conn, "local", Some("gamma")).unwrap();

        let active: Vec<String> = Account::list(&conn, "local")
            .unwrap()
            .into_iter()
            .filter(|a| a.is_active)
            .map(|a| a.account_id)
            .collect();
        assert_eq!(active, vec!["gamma".to_string()]);
    }
}
