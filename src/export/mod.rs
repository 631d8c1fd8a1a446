//! Export formats
//!
//! Pure renderers from entries plus a [`Summary`](crate::metrics::Summary)
//! to CSV, JSON, paged text and PDF, and the full-store backup format.

pub mod backup;
pub mod csv;
pub mod json;
pub mod pdf;
pub mod text;

use std::fs;
use std::path::Path;

use thiserror::Error;

pub use backup::{Backup, ImportSummary};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Output format of `export_entries`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Text,
    Pdf,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "text" | "txt" => Some(ExportFormat::Text),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Text => "text",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Write rendered output, creating parent directories as needed
pub fn write_output(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(ExportFormat::from_str("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_str("txt"), Some(ExportFormat::Text));
        assert_eq!(ExportFormat::from_str("xlsx"), None);
    }

    #[test]
    fn test_write_output_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.txt");
        write_output(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }
}
