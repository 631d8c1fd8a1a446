//! Export MCP Tools
//!
//! Renders entries to CSV/JSON/text/PDF, and writes or restores full
//! backups. Output is returned inline unless an `output_path` is given;
//! PDF always needs a path.

use std::path::Path;

use serde::Serialize;

use super::entries::load_entries;
use crate::db::{now_timestamp, Database};
use crate::export::{self, backup, Backup, ExportFormat, ImportSummary};
use crate::metrics::overall_statistics;
use crate::models::EntryFilter;

/// Response for export_entries
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub format: String,
    pub record_count: usize,
    pub aggregated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Rendered document when no output path was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

/// Response for export_backup
#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub success: bool,
    pub accounts: usize,
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

fn generated_at() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()
}

#[allow(clippy::too_many_arguments)]
pub fn export_entries(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
    format: &str,
    output_path: Option<&str>,
    include_summary: bool,
) -> Result<ExportResponse, String> {
    let format = ExportFormat::from_str(format)
        .ok_or_else(|| format!("Invalid format '{}'. Use 'csv', 'json', 'text' or 'pdf'", format))?;

    let (account, entries) = load_entries(db, owner, account_id, filter, daily)?;
    let summary = overall_statistics(&entries);
    let account_name = account.as_ref().map(|a| a.account_name.as_str());

    let mut pages = None;
    let rendered = match format {
        ExportFormat::Csv => Some(
            export::csv::to_csv(&entries, include_summary.then_some(&summary))
                .map_err(|e| format!("Failed to render CSV: {}", e))?,
        ),
        ExportFormat::Json => Some(
            export::json::to_json(&entries, include_summary.then_some(&summary), &now_timestamp())
                .map_err(|e| format!("Failed to render JSON: {}", e))?,
        ),
        ExportFormat::Text => Some(export::text::to_text(&entries, &summary, account_name, &generated_at())),
        ExportFormat::Pdf => {
            let path = output_path.ok_or("output_path is required for PDF export")?;
            let count = export::pdf::write_pdf(&entries, &summary, account_name, &generated_at(), Path::new(path))
                .map_err(|e| format!("Failed to write PDF: {}", e))?;
            pages = Some(count);
            None
        }
    };

    let content = match (rendered, output_path) {
        (Some(body), Some(path)) => {
            export::write_output(Path::new(path), body.as_bytes())
                .map_err(|e| format!("Failed to write {}: {}", path, e))?;
            None
        }
        (body, _) => body,
    };

    if let Some(path) = output_path {
        tracing::info!(format = format.as_str(), records = entries.len(), path = %path, "Exported entries");
    }

    Ok(ExportResponse {
        success: true,
        format: format.as_str().to_string(),
        record_count: entries.len(),
        aggregated: daily,
        output_path: output_path.map(str::to_string),
        content,
        pages,
    })
}

/// Snapshot all accounts and entries of the owner
pub fn export_backup(db: &Database, owner: &str, output_path: Option<&str>) -> Result<BackupResponse, String> {
    let snapshot = db
        .with_conn(|conn| backup::export_all(conn, owner, &now_timestamp()))
        .map_err(|e| format!("Failed to read store: {}", e))?;
    let json = snapshot.to_json().map_err(|e| format!("Failed to render backup: {}", e))?;

    let content = match output_path {
        Some(path) => {
            export::write_output(Path::new(path), json.as_bytes())
                .map_err(|e| format!("Failed to write {}: {}", path, e))?;
            tracing::info!(path = %path, entries = snapshot.entries.len(), "Wrote backup");
            None
        }
        None => Some(json),
    };

    Ok(BackupResponse {
        success: true,
        accounts: snapshot.accounts.len(),
        entries: snapshot.entries.len(),
        output_path: output_path.map(str::to_string),
        content,
    })
}

/// Restore a backup given inline or as a file path
pub fn import_backup(
    db: &Database,
    owner: &str,
    json: Option<&str>,
    input_path: Option<&str>,
) -> Result<ImportSummary, String> {
    let text = match (json, input_path) {
        (Some(json), None) => json.to_string(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?
        }
        _ => return Err("Provide exactly one of 'json' or 'input_path'".to_string()),
    };

    let parsed = Backup::from_json(&text).map_err(|e| format!("Invalid backup: {}", e))?;

    db.with_conn_mut(|conn| backup::import(conn, owner, &parsed))
        .map_err(|e| format!("Failed to import backup: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::tools::entries::test_support::seeded;

    #[test]
    fn test_inline_csv_with_summary() {
        let (_dir, db) = temp_db();
        seeded(&db);

        let resp = export_entries(&db, "local", None, &EntryFilter::default(), true, "csv", None, true).unwrap();
        assert_eq!(resp.record_count, 2);
        let csv = resp.content.unwrap();
        assert!(csv.starts_with('\u{FEFF}'));
        assert!(csv.contains("Total follower growth,35,"));
    }

    #[test]
    fn test_text_to_file() {
        let (_dir, db) = temp_db();
        seeded(&db);
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("report.txt");

        let resp = export_entries(
            &db,
            "local",
            None,
            &EntryFilter::default(),
            false,
            "text",
            path.to_str(),
            true,
        )
        .unwrap();
        assert!(resp.content.is_none());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Account: Main"));
        assert!(text.contains("Page 1 / 1"));
    }

    #[test]
    fn test_pdf_requires_path() {
        let (_dir, db) = temp_db();
        seeded(&db);
        let err = export_entries(&db, "local", None, &EntryFilter::default(), false, "pdf", None, true).unwrap_err();
        assert!(err.contains("output_path"));

        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("report.pdf");
        let resp = export_entries(&db, "local", None, &EntryFilter::default(), false, "pdf", path.to_str(), true)
            .unwrap();
        assert_eq!(resp.pages, Some(1));
        assert!(path.exists());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let (_dir, db) = temp_db();
        assert!(export_entries(&db, "local", None, &EntryFilter::default(), false, "xml", None, true).is_err());
    }

    #[test]
    fn test_backup_file_round_trip() {
        let (_dir, source) = temp_db();
        seeded(&source);
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("backup.json");

        let resp = export_backup(&source, "local", path.to_str()).unwrap();
        assert_eq!(resp.accounts, 1);
        assert_eq!(resp.entries, 3);

        let (_dir2, target) = temp_db();
        let summary = import_backup(&target, "local", None, path.to_str()).unwrap();
        assert_eq!(summary.entries_imported, 3);
        assert_eq!(summary.active_account_id.as_deref(), Some("main"));

        assert!(import_backup(&target, "local", Some("{}"), path.to_str()).is_err());
        assert!(import_backup(&target, "local", Some("not json"), None).is_err());
    }
}
