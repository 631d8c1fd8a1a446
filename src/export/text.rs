//! Plain-text report
//!
//! The report is built as a flat list of lines, then cut into fixed-height
//! pages, each ending with a `Page i / n` footer. The PDF renderer lays out
//! the same lines.

use crate::analysis::RECENT_ENTRY_COUNT;
use crate::metrics::Summary;
use crate::models::Entry;

pub const RULE_WIDTH: usize = 50;

/// Body lines per text page (footer excluded)
pub const LINES_PER_PAGE: usize = 50;

pub fn heavy_rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn light_rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// True for the separator lines produced by [`heavy_rule`]/[`light_rule`]
pub fn is_rule(line: &str) -> bool {
    !line.is_empty() && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '-'))
}

pub fn page_footer(page: usize, total: usize) -> String {
    format!("Page {} / {}", page, total)
}

/// Report body: header, summary, best/worst day, most recent entries
pub fn report_lines(
    entries: &[Entry],
    summary: &Summary,
    account: Option<&str>,
    generated_at: &str,
) -> Vec<String> {
    let mut lines = vec![
        heavy_rule(),
        "Instagram Growth Report".to_string(),
        heavy_rule(),
        String::new(),
    ];

    if let Some(name) = account {
        lines.push(format!("Account: {}", name));
    }
    lines.push(format!("Generated: {}", generated_at));
    lines.push(String::new());

    lines.push("[Summary]".to_string());
    lines.push(format!("Days recorded: {}", summary.total_records));
    lines.push(format!("Total follower growth: {}", summary.total_follower_growth));
    lines.push(format!("Average follower growth: {} per day", summary.average_follower_growth));
    lines.push(format!("Average follow-back rate: {}%", summary.average_follow_back_rate));
    lines.push(format!("Total operation time: {} minutes", summary.total_operation_time));
    lines.push(format!("Total likes: {}", summary.total_likes));
    lines.push(String::new());

    if !summary.best_performance_date.is_empty() {
        lines.push(format!("Best day: {}", summary.best_performance_date));
    }
    if !summary.worst_performance_date.is_empty() {
        lines.push(format!("Worst day: {}", summary.worst_performance_date));
    }

    lines.push(String::new());
    lines.push(format!("[Most recent {} entries]", RECENT_ENTRY_COUNT));
    lines.push(light_rule());

    for (i, e) in entries.iter().take(RECENT_ENTRY_COUNT).enumerate() {
        lines.push(format!("{}. {}", i + 1, e.date));
        lines.push(format!(
            "   Followers: {} -> {} ({:+})",
            e.counters.followers_before, e.counters.followers_after, e.metrics.follower_growth
        ));
        lines.push(format!(
            "   Following: {} -> {} ({:+})",
            e.counters.following_before, e.counters.following_after, e.metrics.following_growth
        ));
        lines.push(format!("   Follow-back rate: {}%", e.metrics.follow_back_rate));
        lines.push(format!(
            "   Operation time: {} minutes | Likes: {}",
            e.operation_time_minutes, e.likes
        ));
        if let Some(ref note) = e.note {
            lines.push(format!("   Note: {}", note));
        }
        lines.push(String::new());
    }

    lines.push(heavy_rule());
    lines
}

/// Split lines into pages of at most `per_page` lines; always at least one page
pub fn paginate(lines: &[String], per_page: usize) -> Vec<Vec<String>> {
    let per_page = per_page.max(1);
    if lines.is_empty() {
        return vec![Vec::new()];
    }
    lines.chunks(per_page).map(|chunk| chunk.to_vec()).collect()
}

/// Render the full paged report
pub fn to_text(entries: &[Entry], summary: &Summary, account: Option<&str>, generated_at: &str) -> String {
    let lines = report_lines(entries, summary, account, generated_at);
    let pages = paginate(&lines, LINES_PER_PAGE);
    let total = pages.len();

    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        for line in page {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&page_footer(i + 1, total));
        out.push('\n');
        if i + 1 < total {
            out.push('\u{000C}');
        }
    }
    out
}
