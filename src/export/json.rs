//! JSON export

use serde::Serialize;

use super::ExportError;
use crate::metrics::Summary;
use crate::models::Entry;

#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    exported_at: &'a str,
    records: &'a [Entry],
    statistics: Option<&'a Summary>,
}

/// Pretty-printed `{ exported_at, records, statistics }`
pub fn to_json(entries: &[Entry], summary: Option<&Summary>, exported_at: &str) -> Result<String, ExportError> {
    let doc = JsonExport {
        exported_at,
        records: entries,
        statistics: summary,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
