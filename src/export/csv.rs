//! CSV export
//!
//! UTF-8 with a byte-order mark so spreadsheet apps pick the right encoding.
//! An optional summary block follows the rows after one blank row.

use ::csv::WriterBuilder;

use super::ExportError;
use crate::metrics::Summary;
use crate::models::Entry;

const BOM: &str = "\u{FEFF}";

const HEADER: [&str; 17] = [
    "date",
    "account_name",
    "account_id",
    "posts_before",
    "posts_after",
    "followers_before",
    "followers_after",
    "following_before",
    "following_after",
    "follower_growth",
    "following_growth",
    "follow_back_rate",
    "start_time",
    "likes",
    "main_loop_count",
    "operation_time_minutes",
    "note",
];

fn entry_row(e: &Entry) -> Vec<String> {
    vec![
        e.date.clone(),
        e.account_name.clone(),
        e.account_id.clone(),
        e.counters.posts_before.to_string(),
        e.counters.posts_after.to_string(),
        e.counters.followers_before.to_string(),
        e.counters.followers_after.to_string(),
        e.counters.following_before.to_string(),
        e.counters.following_after.to_string(),
        e.metrics.follower_growth.to_string(),
        e.metrics.following_growth.to_string(),
        e.metrics.follow_back_rate.to_string(),
        e.start_time.clone().unwrap_or_default(),
        e.likes.to_string(),
        e.main_loop_count.to_string(),
        e.operation_time_minutes.to_string(),
        e.note.clone().unwrap_or_default(),
    ]
}

/// Label/value row padded to the header width
fn summary_row(label: &str, value: String) -> Vec<String> {
    let mut row = vec![String::new(); HEADER.len()];
    row[0] = label.to_string();
    row[1] = value;
    row
}

pub fn to_csv(entries: &[Entry], summary: Option<&Summary>) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for entry in entries {
        writer.write_record(entry_row(entry))?;
    }

    if let Some(s) = summary {
        writer.write_record(vec![String::new(); HEADER.len()])?;
        writer.write_record(summary_row("Summary", String::new()))?;
        writer.write_record(summary_row("Total records", s.total_records.to_string()))?;
        writer.write_record(summary_row(
            "Total follower growth",
            s.total_follower_growth.to_string(),
        ))?;
        writer.write_record(summary_row(
            "Average follower growth",
            s.average_follower_growth.to_string(),
        ))?;
        writer.write_record(summary_row(
            "Average follow-back rate",
            format!("{}%", s.average_follow_back_rate),
        ))?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    let body = String::from_utf8(bytes)
        .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    Ok(format!("{}{}", BOM, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::entry;
    use crate::metrics::overall_statistics;

    #[test]
    fn test_header_rows_and_bom() {
        let entries = vec![entry(1, "2024-01-01", (100, 110), (50, 60))];
        let csv = to_csv(&entries, None).unwrap();

        assert!(csv.starts_with(BOM));
        let lines: Vec<&str> = csv.trim_start_matches(BOM).lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("date,account_name,account_id,"));
        assert!(lines[1].starts_with("2024-01-01,Test Account,test_account,10,10,100,110,50,60,10,10,100,"));
    }

    #[test]
    fn test_quotes_fields_with_separators() {
        let mut e = entry(1, "2024-01-01", (0, 1), (0, 0));
        e.note = Some("slow day, \"shadowban\"?\nmaybe".to_string());
        let csv = to_csv(&[e], None).unwrap();
        assert!(csv.contains("\"slow day, \"\"shadowban\"\"?\nmaybe\""));
    }

    #[test]
    fn test_summary_block() {
        let entries = vec![
            entry(1, "2024-01-01", (100, 110), (50, 60)),
            entry(2, "2024-01-02", (110, 115), (60, 70)),
        ];
        let summary = overall_statistics(&entries);
        let csv = to_csv(&entries, Some(&summary)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        // header + 2 rows + blank + 5 summary rows
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[3], ",".repeat(HEADER.len() - 1));
        assert!(lines[4].starts_with("Summary,"));
        assert!(lines[5].starts_with("Total records,2,"));
        assert!(lines[6].starts_with("Total follower growth,15,"));
        assert!(lines[7].starts_with("Average follower growth,7.5,"));
        assert!(lines[8].starts_with("Average follow-back rate,75%,"));
    }
}
