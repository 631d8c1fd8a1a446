//! Analysis MCP Tool
//!
//! Runs the narrative analysis over the selected entries. The database is
//! read up front so no connection is held across the provider call.

use serde::Serialize;

use super::entries::load_entries;
use crate::analysis::{analyze, AnalysisProvider, AnalysisRequest, Goal, GoalKind, OpenAiClient, Report};
use crate::config::AiSettings;
use crate::db::Database;
use crate::metrics::overall_statistics;
use crate::models::EntryFilter;

/// Response for analyze_growth
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub account_id: Option<String>,
    pub aggregated: bool,
    pub entries_analyzed: usize,
    pub report: Report,
}

/// Build a goal from tool arguments; all three parts must be present together
pub fn parse_goal(kind: Option<&str>, value: Option<f64>, timeframe: Option<String>) -> Result<Option<Goal>, String> {
    match (kind, value) {
        (None, None) => Ok(None),
        (Some(kind), Some(value)) => {
            let kind = GoalKind::from_str(kind).ok_or_else(|| {
                format!("Invalid goal type '{}'. Use 'follower', 'engagement' or 'growth_rate'", kind)
            })?;
            Ok(Some(Goal {
                kind,
                value,
                timeframe: timeframe.unwrap_or_else(|| "unspecified".to_string()),
            }))
        }
        _ => Err("goal_type and goal_value must be given together".to_string()),
    }
}

fn build_request(
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
    goal: Option<Goal>,
) -> Result<(Option<String>, AnalysisRequest), String> {
    let (account, entries) = load_entries(db, owner, account_id, filter, daily)?;
    let summary = overall_statistics(&entries);
    Ok((account.map(|a| a.account_id), AnalysisRequest { entries, summary, goal }))
}

/// Analyze with any provider
pub async fn analyze_with(
    provider: &dyn AnalysisProvider,
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
    goal: Option<Goal>,
) -> Result<AnalyzeResponse, String> {
    let (account_id, request) = build_request(db, owner, account_id, filter, daily, goal)?;
    let report = analyze(provider, &request).await;

    Ok(AnalyzeResponse {
        account_id,
        aggregated: daily,
        entries_analyzed: request.entries.len(),
        report,
    })
}

/// Analyze with the configured OpenAI client
pub async fn analyze_growth(
    settings: &AiSettings,
    db: &Database,
    owner: &str,
    account_id: Option<&str>,
    filter: &EntryFilter,
    daily: bool,
    goal: Option<Goal>,
) -> Result<AnalyzeResponse, String> {
    let client = OpenAiClient::new(settings.clone()).map_err(|e| format!("Failed to create HTTP client: {}", e))?;
    if !client.has_api_key() {
        tracing::warn!("IGTRACK_OPENAI_API_KEY is not set; analysis will use the fallback report");
    }
    analyze_with(&client, db, owner, account_id, filter, daily, goal).await
}
