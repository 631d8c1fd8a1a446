//! Entry model
//!
//! One recorded operating session: before/after counters captured at the
//! start and end, activity counters, and growth metrics derived on write.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{now_timestamp, DbError, DbResult};
use crate::metrics::{Counters, GrowthMetrics};

/// A recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub date: String, // ISO date: "2025-01-09"
    pub start_time: Option<String>,
    #[serde(flatten)]
    pub counters: Counters,
    pub likes: i64,
    pub main_loop_count: i64,
    pub operation_time_minutes: i64,
    #[serde(flatten)]
    pub metrics: GrowthMetrics,
    pub note: Option<String>,
    pub account_name: String,
    pub account_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for recording a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCreate {
    pub account_id: String,
    pub date: String,
    pub start_time: Option<String>,
    #[serde(flatten)]
    pub counters: Counters,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub main_loop_count: i64,
    #[serde(default)]
    pub operation_time_minutes: i64,
    pub note: Option<String>,
}

/// Partial update; derived metrics are recomputed from the merged counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub date: Option<String>,
    /// `Some("")` clears the stored value
    pub start_time: Option<String>,
    pub posts_before: Option<i64>,
    pub posts_after: Option<i64>,
    pub followers_before: Option<i64>,
    pub followers_after: Option<i64>,
    pub following_before: Option<i64>,
    pub following_after: Option<i64>,
    pub likes: Option<i64>,
    pub main_loop_count: Option<i64>,
    pub operation_time_minutes: Option<i64>,
    /// `Some("")` clears the stored value
    pub note: Option<String>,
}

/// Query-side restrictions for listing entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Inclusive lower date bound
    pub start_date: Option<String>,
    /// Inclusive upper date bound
    pub end_date: Option<String>,
    pub min_follower_growth: Option<i64>,
    pub max_follower_growth: Option<i64>,
}

/// Check that a date is `YYYY-MM-DD`
pub fn validate_date(date: &str) -> DbResult<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| DbError::InvalidInput(format!("date must be YYYY-MM-DD, got '{}'", date)))
}

/// Largest accepted counter value
pub const MAX_COUNT: i64 = i32::MAX as i64;

fn validate_non_negative(name: &str, value: i64) -> DbResult<()> {
    if !(0..=MAX_COUNT).contains(&value) {
        return Err(DbError::InvalidInput(format!(
            "{} must be between 0 and {}, got {}",
            name, MAX_COUNT, value
        )));
    }
    Ok(())
}

/// Apply an optional text update; an empty string clears the field
fn merge_text(update: Option<&str>, existing: Option<String>) -> Option<String> {
    match update {
        Some("") => None,
        Some(value) => Some(value.to_string()),
        None => existing,
    }
}

fn validate_counters(c: &Counters) -> DbResult<()> {
    validate_non_negative("posts_before", c.posts_before)?;
    validate_non_negative("posts_after", c.posts_after)?;
    validate_non_negative("followers_before", c.followers_before)?;
    validate_non_negative("followers_after", c.followers_after)?;
    validate_non_negative("following_before", c.following_before)?;
    validate_non_negative("following_after", c.following_after)
}

fn validate_activity(likes: i64, main_loop_count: i64, operation_time_minutes: i64) -> DbResult<()> {
    validate_non_negative("likes", likes)?;
    validate_non_negative("main_loop_count", main_loop_count)?;
    validate_non_negative("operation_time_minutes", operation_time_minutes)
}

impl EntryCreate {
    pub fn validate(&self) -> DbResult<()> {
        validate_date(&self.date)?;
        validate_counters(&self.counters)?;
        validate_activity(self.likes, self.main_loop_count, self.operation_time_minutes)
    }
}

impl Entry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            counters: Counters {
                posts_before: row.get("posts_before")?,
                posts_after: row.get("posts_after")?,
                followers_before: row.get("followers_before")?,
                followers_after: row.get("followers_after")?,
                following_before: row.get("following_before")?,
                following_after: row.get("following_after")?,
            },
            likes: row.get("likes")?,
            main_loop_count: row.get("main_loop_count")?,
            operation_time_minutes: row.get("operation_time_minutes")?,
            metrics: GrowthMetrics {
                follower_growth: row.get("follower_growth")?,
                following_growth: row.get("following_growth")?,
                post_growth: row.get("post_growth")?,
                follow_back_rate: row.get("follow_back_rate")?,
            },
            note: row.get("note")?,
            account_name: row.get("account_name")?,
            account_id: row.get("account_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Record a new session for an account
    pub fn create(
        conn: &Connection,
        owner: &str,
        account_name: &str,
        data: &EntryCreate,
    ) -> DbResult<Self> {
        let now = now_timestamp();
        Self::insert(conn, owner, account_name, data, &now)
    }

    /// Insert with an explicit creation timestamp (used when restoring backups)
    pub fn insert(
        conn: &Connection,
        owner: &str,
        account_name: &str,
        data: &EntryCreate,
        created_at: &str,
    ) -> DbResult<Self> {
        data.validate()?;
        let c = &data.counters;
        let m = GrowthMetrics::from_counters(c);

        conn.execute(
            r#"
            INSERT INTO entries (
                owner_id, account_id, account_name, date, start_time,
                posts_before, posts_after, followers_before, followers_after,
                following_before, following_after,
                likes, main_loop_count, operation_time_minutes,
                follower_growth, following_growth, post_growth, follow_back_rate,
                note, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18, ?19, ?20, ?20)
            "#,
            params![
                owner,
                data.account_id,
                account_name,
                data.date,
                data.start_time,
                c.posts_before,
                c.posts_after,
                c.followers_before,
                c.followers_after,
                c.following_before,
                c.following_after,
                data.likes,
                data.main_loop_count,
                data.operation_time_minutes,
                m.follower_growth,
                m.following_growth,
                m.post_growth,
                m.follow_back_rate,
                data.note,
                created_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, owner, id)?.ok_or_else(|| DbError::NotFound(format!("Entry {}", id)))
    }

    /// Get an entry by ID
    pub fn get_by_id(conn: &Connection, owner: &str, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM entries WHERE owner_id = ?1 AND id = ?2")?;

        let result = stmt.query_row(params![owner, id], Self::from_row);
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List entries, newest date first, optionally for one account
    pub fn list(
        conn: &Connection,
        owner: &str,
        account_id: Option<&str>,
        filter: &EntryFilter,
    ) -> DbResult<Vec<Self>> {
        let mut sql = String::from("SELECT * FROM entries WHERE owner_id = ?1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];

        if let Some(account) = account_id {
            params_vec.push(Box::new(account.to_string()));
            sql.push_str(&format!(" AND account_id = ?{}", params_vec.len()));
        }

        if let Some(ref start) = filter.start_date {
            params_vec.push(Box::new(start.clone()));
            sql.push_str(&format!(" AND date >= ?{}", params_vec.len()));
        }

        if let Some(ref end) = filter.end_date {
            params_vec.push(Box::new(end.clone()));
            sql.push_str(&format!(" AND date <= ?{}", params_vec.len()));
        }

        if let Some(min) = filter.min_follower_growth {
            params_vec.push(Box::new(min));
            sql.push_str(&format!(" AND follower_growth >= ?{}", params_vec.len()));
        }

        if let Some(max) = filter.max_follower_growth {
            params_vec.push(Box::new(max));
            sql.push_str(&format!(" AND follower_growth <= ?{}", params_vec.len()));
        }

        sql.push_str(" ORDER BY date DESC, created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let entries = stmt
            .query_map(params_refs.as_slice(), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Count entries, optionally for one account
    pub fn count(conn: &Connection, owner: &str, account_id: Option<&str>) -> DbResult<i64> {
        let count: i64 = match account_id {
            Some(account) => conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE owner_id = ?1 AND account_id = ?2",
                params![owner, account],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    /// Apply a partial update and recompute the derived metrics
    pub fn update(
        conn: &Connection,
        owner: &str,
        id: i64,
        data: &EntryUpdate,
    ) -> DbResult<Option<Self>> {
        let existing = match Self::get_by_id(conn, owner, id)? {
            Some(e) => e,
            None => return Ok(None),
        };

        let date = data.date.clone().unwrap_or(existing.date);
        validate_date(&date)?;

        let prev = existing.counters;
        let counters = Counters {
            posts_before: data.posts_before.unwrap_or(prev.posts_before),
            posts_after: data.posts_after.unwrap_or(prev.posts_after),
            followers_before: data.followers_before.unwrap_or(prev.followers_before),
            followers_after: data.followers_after.unwrap_or(prev.followers_after),
            following_before: data.following_before.unwrap_or(prev.following_before),
            following_after: data.following_after.unwrap_or(prev.following_after),
        };
        validate_counters(&counters)?;

        let likes = data.likes.unwrap_or(existing.likes);
        let main_loop_count = data.main_loop_count.unwrap_or(existing.main_loop_count);
        let operation_time_minutes = data
            .operation_time_minutes
            .unwrap_or(existing.operation_time_minutes);
        validate_activity(likes, main_loop_count, operation_time_minutes)?;

        let start_time = merge_text(data.start_time.as_deref(), existing.start_time);
        let note = merge_text(data.note.as_deref(), existing.note);
        let m = GrowthMetrics::from_counters(&counters);

        conn.execute(
            r#"
            UPDATE entries SET
                date = ?1, start_time = ?2,
                posts_before = ?3, posts_after = ?4,
                followers_before = ?5, followers_after = ?6,
                following_before = ?7, following_after = ?8,
                likes = ?9, main_loop_count = ?10, operation_time_minutes = ?11,
                follower_growth = ?12, following_growth = ?13, post_growth = ?14,
                follow_back_rate = ?15,
                note = ?16, updated_at = ?17
            WHERE owner_id = ?18 AND id = ?19
            "#,
            params![
                date,
                start_time,
                counters.posts_before,
                counters.posts_after,
                counters.followers_before,
                counters.followers_after,
                counters.following_before,
                counters.following_after,
                likes,
                main_loop_count,
                operation_time_minutes,
                m.follower_growth,
                m.following_growth,
                m.post_growth,
                m.follow_back_rate,
                note,
                now_timestamp(),
                owner,
                id,
            ],
        )?;

        Self::get_by_id(conn, owner, id)
    }

    /// Keep the denormalized account name in step with a rename
    pub fn rename_account(
        conn: &Connection,
        owner: &str,
        account_id: &str,
        account_name: &str,
    ) -> DbResult<usize> {
        let rows = conn.execute(
            "UPDATE entries SET account_name = ?1 WHERE owner_id = ?2 AND account_id = ?3",
            params![account_name, owner, account_id],
        )?;
        Ok(rows)
    }

    /// Delete an entry
    pub fn delete(conn: &Connection, owner: &str, id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM entries WHERE owner_id = ?1 AND id = ?2",
            params![owner, id],
        )?;
        Ok(rows > 0)
    }

    /// Delete every entry of an account
    pub fn delete_for_account(conn: &Connection, owner: &str, account_id: &str) -> DbResult<usize> {
        let rows = conn.execute(
            "DELETE FROM entries WHERE owner_id = ?1 AND account_id = ?2",
            params![owner, account_id],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
impl Entry {
    /// In-memory entry for computation tests; `created_at` follows `id`
    pub(crate) fn synthetic_for_tests(
        id: i64,
        date: &str,
        followers: (i64, i64),
        following: (i64, i64),
    ) -> Self {
        let counters = Counters {
            posts_before: 10,
            posts_after: 10,
            followers_before: followers.0,
            followers_after: followers.1,
            following_before: following.0,
            following_after: following.1,
        };
        Self {
            id,
            date: date.to_string(),
            start_time: None,
            counters,
            likes: 0,
            main_loop_count: 0,
            operation_time_minutes: 0,
            metrics: GrowthMetrics::from_counters(&counters),
            note: None,
            account_name: "Test Account".to_string(),
            account_id: "test_account".to_string(),
            created_at: format!("2024-01-01T00:00:{:02}.000000Z", id.rem_euclid(60)),
            updated_at: format!("2024-01-01T00:00:{:02}.000000Z", id.rem_euclid(60)),
        }
    }
}
