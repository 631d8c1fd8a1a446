//! Utility to restore a JSON backup into the configured database
//!
//! Usage: import_backup <backup.json>

use igtrack::config::Settings;
use igtrack::db::Database;
use igtrack::export::{backup, Backup};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("Usage: import_backup <backup.json>");
            std::process::exit(2);
        }
    };

    let settings = Settings::from_env();
    println!("Database path: {}", settings.database_path.display());
    println!("Owner: {}", settings.owner);

    if let Some(parent) = settings.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database = Database::open_migrated(&settings.database_path)?;

    let text = std::fs::read_to_string(&path)?;
    let parsed = Backup::from_json(&text)?;
    println!(
        "Backup from {}: {} accounts, {} entries",
        parsed.exported_at,
        parsed.accounts.len(),
        parsed.entries.len()
    );

    let summary = database.with_conn_mut(|conn| backup::import(conn, &settings.owner, &parsed))?;

    println!("Import complete:");
    println!("  Accounts created: {}", summary.accounts_created);
    println!("  Accounts skipped: {}", summary.accounts_skipped);
    println!("  Entries imported: {}", summary.entries_imported);
    println!("  Entries skipped:  {}", summary.entries_skipped);
    if let Some(active) = summary.active_account_id {
        println!("  Active account:   {}", active);
    }

    Ok(())
}
