//! igtrack Status Tool
//!
//! Runtime status of the service plus the usage guide served to assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database};
use crate::models::{Account, Entry};

/// Usage guide for AI assistants
pub const USAGE_INSTRUCTIONS: &str = r#"
# igtrack Usage Guide

igtrack records Instagram growth sessions and turns them into statistics,
AI analysis and reports.

## Accounts

Every entry belongs to an account. Create one first:

- `create_account` with `account_name` and `account_id` (the Instagram handle).
  The new account becomes the active one unless `activate` is false.
- `set_active_account` switches the active account.
- Tools that take an optional `account_id` fall back to the active account.
  With no active account they cover all accounts.
- `delete_account` removes the account AND all of its entries.

## Recording a session

Call `create_entry` once per operating session with the counters read at the
start (`*_before`) and at the end (`*_after`):

- `posts_before`, `posts_after`
- `followers_before`, `followers_after`
- `following_before`, `following_after`
- `likes`, `main_loop_count`, `operation_time_minutes`
- `date` as YYYY-MM-DD, optional `start_time` and `note`

Growth and follow-back rate are computed automatically; never send them.

## Several sessions on one day

Pass `daily: true` to listing, statistics, analysis and export tools to merge
same-day sessions into one day. A merged day uses the first session's
`before` values and the last session's `after` values, and sums likes, loops
and time.

## Statistics

- `get_statistics`: totals, averages, best/worst day and the growth trend
  (later half vs earlier half of the period).
- `get_periodic_statistics` with `granularity` `week` (Sunday start) or `month`.

## Analysis

`analyze_growth` asks the configured OpenAI model for a report. Without an
API key, or if the call fails, a built-in summary report is returned and
`source` is `fallback`. Optional goal: `goal_type` (`follower`, `engagement`,
`growth_rate`), `goal_value`, `goal_timeframe`.

## Export

- `export_entries` with `format` `csv`, `json`, `text` or `pdf`.
  Without `output_path` the document is returned inline (not for PDF).
- `export_backup` / `import_backup` move everything between databases.
"#;

/// Runtime status of the igtrack service
#[derive(Debug, Clone, Serialize)]
pub struct IgTrackStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub owner: String,
    pub account_count: Option<i64>,
    pub entry_count: Option<i64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    owner: String,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, owner: String) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            owner,
        }
    }

    /// Get the current status. Store counts are `None` if the database is unreadable.
    pub fn get_status(&self, db: &Database) -> IgTrackStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let counts = db.with_conn(|conn| {
            Ok((
                migrations::get_schema_version(conn)?,
                Account::count(conn, &self.owner)?,
                Entry::count(conn, &self.owner, None)?,
            ))
        });
        let (schema_version, account_count, entry_count) = match counts {
            Ok((v, a, e)) => (Some(v), Some(a), Some(e)),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read store counts for status");
                (None, None, None)
            }
        };

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        IgTrackStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            owner: self.owner.clone(),
            account_count,
            entry_count,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
