//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: accounts, entries, preferences
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- ACCOUNTS
        -- Tracked Instagram identities, one set per owner
        -- ============================================
        CREATE TABLE accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            account_id TEXT NOT NULL,            -- external platform handle
            account_name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,

            UNIQUE(owner_id, account_id)
        );

        CREATE INDEX idx_accounts_owner ON accounts(owner_id);

        -- ============================================
        -- ENTRIES
        -- One recorded operating session
        -- ============================================
        CREATE TABLE entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            account_id TEXT NOT NULL,
            account_name TEXT NOT NULL,          -- denormalized from accounts
            date TEXT NOT NULL,                  -- ISO date: "2025-01-09"
            start_time TEXT,

            posts_before INTEGER NOT NULL CHECK(posts_before BETWEEN 0 AND 2147483647),
            posts_after INTEGER NOT NULL CHECK(posts_after BETWEEN 0 AND 2147483647),
            followers_before INTEGER NOT NULL CHECK(followers_before BETWEEN 0 AND 2147483647),
            followers_after INTEGER NOT NULL CHECK(followers_after BETWEEN 0 AND 2147483647),
            following_before INTEGER NOT NULL CHECK(following_before BETWEEN 0 AND 2147483647),
            following_after INTEGER NOT NULL CHECK(following_after BETWEEN 0 AND 2147483647),

            likes INTEGER NOT NULL DEFAULT 0 CHECK(likes BETWEEN 0 AND 2147483647),
            main_loop_count INTEGER NOT NULL DEFAULT 0 CHECK(main_loop_count BETWEEN 0 AND 2147483647),
            operation_time_minutes INTEGER NOT NULL DEFAULT 0 CHECK(operation_time_minutes BETWEEN 0 AND 2147483647),

            -- Derived on every write from the counters above
            follower_growth INTEGER NOT NULL DEFAULT 0,
            following_growth INTEGER NOT NULL DEFAULT 0,
            post_growth INTEGER NOT NULL DEFAULT 0,
            follow_back_rate REAL NOT NULL DEFAULT 0,

            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,

            FOREIGN KEY (owner_id, account_id)
                REFERENCES accounts(owner_id, account_id) ON DELETE CASCADE
        );

        CREATE INDEX idx_entries_owner_account ON entries(owner_id, account_id);
        CREATE INDEX idx_entries_date ON entries(date);

        -- ============================================
        -- PREFERENCES
        -- Per-owner singleton holding the active account
        -- ============================================
        CREATE TABLE preferences (
            owner_id TEXT PRIMARY KEY,
            active_account_id TEXT,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    Ok(get_schema_version(conn)? < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration_after_bootstrap(&conn));

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    fn needs_migration_after_bootstrap(conn: &Connection) -> bool {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT)",
            [],
        )
        .unwrap();
        needs_migration(conn).unwrap()
    }
}
