//! igtrack MCP Server Implementation
//!
//! Wires the tool modules to the MCP protocol.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::db::Database;
use crate::metrics::Counters;
use crate::models::{EntryCreate, EntryFilter, EntryUpdate};
use crate::tools::status::StatusTracker;
use crate::tools::{accounts, analysis, entries, export, statistics};

/// igtrack MCP Service
#[derive(Clone)]
pub struct IgTrackService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    settings: Arc<Settings>,
    tool_router: ToolRouter<IgTrackService>,
}

impl IgTrackService {
    pub fn new(settings: Settings, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                settings.database_path.clone(),
                settings.owner.clone(),
            ))),
            database,
            settings: Arc::new(settings),
            tool_router: Self::tool_router(),
        }
    }

    fn owner(&self) -> &str {
        &self.settings.owner
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn default_true() -> bool { true }

// ============================================================================
// Account Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateAccountParams {
    /// Display name
    pub account_name: String,
    /// Instagram handle or other external identifier, unique per user
    pub account_id: String,
    /// Make the new account the active one (default true)
    #[serde(default = "default_true")]
    pub activate: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AccountIdParams {
    pub account_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateAccountParams {
    pub account_id: String,
    /// New display name; also applied to the account's entries
    pub account_name: Option<String>,
}

// ============================================================================
// Entry Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateEntryParams {
    /// Account to record for; defaults to the active account
    pub account_id: Option<String>,
    /// Session date (YYYY-MM-DD)
    pub date: String,
    /// Free-text start time, e.g. "21:30"
    pub start_time: Option<String>,
    pub posts_before: i64,
    pub posts_after: i64,
    pub followers_before: i64,
    pub followers_after: i64,
    pub following_before: i64,
    pub following_after: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub main_loop_count: i64,
    #[serde(default)]
    pub operation_time_minutes: i64,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EntryIdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateEntryParams {
    pub id: i64,
    pub date: Option<String>,
    /// Session start time; an empty string clears it
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
    /// Free-form note; an empty string clears it
    pub note: Option<String>,
}

/// Which entries a query covers
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SelectionParams {
    /// Account to query; defaults to the active account, or all accounts if none is active
    pub account_id: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub end_date: Option<String>,
    pub min_follower_growth: Option<i64>,
    pub max_follower_growth: Option<i64>,
    /// Merge same-day entries into one per day before processing
    #[serde(default)]
    pub daily: bool,
}

impl SelectionParams {
    fn filter(&self) -> EntryFilter {
        EntryFilter {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            min_follower_growth: self.min_follower_growth,
            max_follower_growth: self.max_follower_growth,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListEntriesParams {
    #[serde(flatten)]
    pub selection: SelectionParams,
    /// Maximum number of entries returned (newest first)
    pub limit: Option<usize>,
}

// ============================================================================
// Statistics / Analysis / Export Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StatisticsParams {
    #[serde(flatten)]
    pub selection: SelectionParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PeriodicStatisticsParams {
    #[serde(flatten)]
    pub selection: SelectionParams,
    /// 'week' (Sunday start) or 'month'
    pub granularity: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeParams {
    #[serde(flatten)]
    pub selection: SelectionParams,
    /// 'follower', 'engagement' or 'growth_rate'
    pub goal_type: Option<String>,
    pub goal_value: Option<f64>,
    /// Free text, e.g. "1 month"
    pub goal_timeframe: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportParams {
    #[serde(flatten)]
    pub selection: SelectionParams,
    /// 'csv', 'json', 'text' or 'pdf'
    pub format: String,
    /// File to write; required for pdf, otherwise the document is returned inline
    pub output_path: Option<String>,
    /// Append summary statistics (csv/json)
    #[serde(default = "default_true")]
    pub include_summary: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportBackupParams {
    /// File to write; the backup is returned inline when omitted
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportBackupParams {
    /// Backup document as a JSON string
    pub json: Option<String>,
    /// Path of a backup file
    pub input_path: Option<String>,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl IgTrackService {
    // --- Status ---

    #[tool(description = "Get the current status of the igtrack service including build info, database counts, and process information")]
    async fn igtrack_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        json_result(&status)
    }

    #[tool(description = "Get the usage guide for recording sessions and reading statistics. Call this when starting a tracking session or when unsure how to use the tools.")]
    fn usage_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::USAGE_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(USAGE_INSTRUCTIONS)]))
    }

    // --- Accounts ---

    #[tool(description = "List all tracked accounts and which one is active")]
    fn list_accounts(&self) -> Result<CallToolResult, McpError> {
        let result = accounts::list_accounts(&self.database, self.owner()).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Create a tracked account. It becomes the active account unless activate=false")]
    fn create_account(&self, Parameters(p): Parameters<CreateAccountParams>) -> Result<CallToolResult, McpError> {
        let result = accounts::create_account(&self.database, self.owner(), &p.account_name, &p.account_id, p.activate)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get one account by its account_id")]
    fn get_account(&self, Parameters(p): Parameters<AccountIdParams>) -> Result<CallToolResult, McpError> {
        let result = accounts::get_account(&self.database, self.owner(), &p.account_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(account) => json_result(&account),
            None => json_result(&serde_json::json!({"error": "Account not found", "account_id": p.account_id})),
        }
    }

    #[tool(description = "Rename an account; the new name is applied to its entries too")]
    fn update_account(&self, Parameters(p): Parameters<UpdateAccountParams>) -> Result<CallToolResult, McpError> {
        let result = accounts::update_account(&self.database, self.owner(), &p.account_id, p.account_name)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(account) => json_result(&account),
            None => json_result(&serde_json::json!({"error": "Account not found", "account_id": p.account_id})),
        }
    }

    #[tool(description = "Delete an account AND all of its entries. If it was active, the most recently created remaining account becomes active")]
    fn delete_account(&self, Parameters(p): Parameters<AccountIdParams>) -> Result<CallToolResult, McpError> {
        let result = accounts::delete_account(&self.database, self.owner(), &p.account_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(deletion) => json_result(&deletion),
            None => json_result(&serde_json::json!({"success": false, "account_id": p.account_id})),
        }
    }

    #[tool(description = "Make an account the active one")]
    fn set_active_account(&self, Parameters(p): Parameters<AccountIdParams>) -> Result<CallToolResult, McpError> {
        let result = accounts::set_active_account(&self.database, self.owner(), &p.account_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get the active account, if any")]
    fn get_active_account(&self) -> Result<CallToolResult, McpError> {
        let result = accounts::get_active_account(&self.database, self.owner())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&serde_json::json!({ "active_account": result }))
    }

    // --- Entries ---

    #[tool(description = "Record one operating session with before/after counters. Growth and follow-back rate are computed automatically")]
    fn create_entry(&self, Parameters(p): Parameters<CreateEntryParams>) -> Result<CallToolResult, McpError> {
        let account_id = match p.account_id {
            Some(id) => id,
            None => accounts::get_active_account(&self.database, self.owner())
                .map_err(|e| McpError::internal_error(e, None))?
                .map(|a| a.account_id)
                .ok_or_else(|| McpError::internal_error("No active account; pass account_id or create an account first", None))?,
        };

        let data = EntryCreate {
            account_id,
            date: p.date,
            start_time: p.start_time,
            counters: Counters {
                posts_before: p.posts_before,
                posts_after: p.posts_after,
                followers_before: p.followers_before,
                followers_after: p.followers_after,
                following_before: p.following_before,
                following_after: p.following_after,
            },
            likes: p.likes,
            main_loop_count: p.main_loop_count,
            operation_time_minutes: p.operation_time_minutes,
            note: p.note,
        };
        let result = entries::create_entry(&self.database, self.owner(), data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get one entry by ID")]
    fn get_entry(&self, Parameters(p): Parameters<EntryIdParams>) -> Result<CallToolResult, McpError> {
        let result = entries::get_entry(&self.database, self.owner(), p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(entry) => json_result(&entry),
            None => json_result(&serde_json::json!({"error": "Entry not found", "id": p.id})),
        }
    }

    #[tool(description = "List entries newest first, with optional date range, growth bounds, per-day merging (daily=true) and limit")]
    fn list_entries(&self, Parameters(p): Parameters<ListEntriesParams>) -> Result<CallToolResult, McpError> {
        let s = &p.selection;
        let result = entries::list_entries(&self.database, self.owner(), s.account_id.as_deref(), &s.filter(), s.daily, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update fields of an entry. Derived metrics are recomputed")]
    fn update_entry(&self, Parameters(p): Parameters<UpdateEntryParams>) -> Result<CallToolResult, McpError> {
        let data = EntryUpdate {
            date: p.date,
            start_time: p.start_time,
            posts_before: p.posts_before,
            posts_after: p.posts_after,
            followers_before: p.followers_before,
            followers_after: p.followers_after,
            following_before: p.following_before,
            following_after: p.following_after,
            likes: p.likes,
            main_loop_count: p.main_loop_count,
            operation_time_minutes: p.operation_time_minutes,
            note: p.note,
        };
        let result = entries::update_entry(&self.database, self.owner(), p.id, &data)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(entry) => json_result(&entry),
            None => json_result(&serde_json::json!({"error": "Entry not found", "id": p.id})),
        }
    }

    #[tool(description = "Delete an entry")]
    fn delete_entry(&self, Parameters(p): Parameters<EntryIdParams>) -> Result<CallToolResult, McpError> {
        let deleted = entries::delete_entry(&self.database, self.owner(), p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&serde_json::json!({"success": deleted, "id": p.id}))
    }

    #[tool(description = "Merge same-day entries into daily summaries (first session's before values, last session's after values, summed activity) including the sub-entries")]
    fn get_daily_aggregates(&self, Parameters(p): Parameters<StatisticsParams>) -> Result<CallToolResult, McpError> {
        let s = &p.selection;
        let result = entries::get_daily_aggregates(&self.database, self.owner(), s.account_id.as_deref(), &s.filter())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Statistics ---

    #[tool(description = "Summary statistics (totals, averages, best/worst day) and growth trend of the selected entries")]
    fn get_statistics(&self, Parameters(p): Parameters<StatisticsParams>) -> Result<CallToolResult, McpError> {
        let s = &p.selection;
        let result = statistics::get_statistics(&self.database, self.owner(), s.account_id.as_deref(), &s.filter(), s.daily)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Weekly (Sunday start) or monthly rollups of the selected entries, newest period first")]
    fn get_periodic_statistics(&self, Parameters(p): Parameters<PeriodicStatisticsParams>) -> Result<CallToolResult, McpError> {
        let s = &p.selection;
        let result = statistics::get_periodic_statistics(
            &self.database,
            self.owner(),
            s.account_id.as_deref(),
            &s.filter(),
            &p.granularity,
            s.daily,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Analysis ---

    #[tool(description = "AI analysis of the selected entries with insights, recommendations and next actions. Falls back to a built-in report when no API key is configured or the call fails")]
    async fn analyze_growth(&self, Parameters(p): Parameters<AnalyzeParams>) -> Result<CallToolResult, McpError> {
        let goal = analysis::parse_goal(p.goal_type.as_deref(), p.goal_value, p.goal_timeframe)
            .map_err(|e| McpError::internal_error(e, None))?;
        let s = &p.selection;
        let result = analysis::analyze_growth(
            &self.settings.ai,
            &self.database,
            self.owner(),
            s.account_id.as_deref(),
            &s.filter(),
            s.daily,
            goal,
        )
        .await
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Export ---

    #[tool(description = "Export the selected entries as csv, json, paged text, or pdf (pdf requires output_path)")]
    fn export_entries(&self, Parameters(p): Parameters<ExportParams>) -> Result<CallToolResult, McpError> {
        let s = &p.selection;
        let result = export::export_entries(
            &self.database,
            self.owner(),
            s.account_id.as_deref(),
            &s.filter(),
            s.daily,
            &p.format,
            p.output_path.as_deref(),
            p.include_summary,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Back up all accounts, entries and the active account as JSON")]
    fn export_backup(&self, Parameters(p): Parameters<ExportBackupParams>) -> Result<CallToolResult, McpError> {
        let result = export::export_backup(&self.database, self.owner(), p.output_path.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Restore a JSON backup (inline json or input_path). Existing accounts and entries are skipped")]
    fn import_backup(&self, Parameters(p): Parameters<ImportBackupParams>) -> Result<CallToolResult, McpError> {
        let result = export::import_backup(&self.database, self.owner(), p.json.as_deref(), p.input_path.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

#[tool_handler]
impl ServerHandler for IgTrackService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "igtrack".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Instagram Growth Tracker".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Instagram Growth Tracker (igtrack) - record growth sessions and analyze them. \
                 IMPORTANT: Call usage_instructions before recording sessions. \
                 Accounts: list/create/get/update/delete_account, set_active_account, get_active_account. \
                 Entries: create/get/list/update/delete_entry, get_daily_aggregates. \
                 Statistics: get_statistics, get_periodic_statistics. \
                 Analysis: analyze_growth. \
                 Export: export_entries (csv/json/text/pdf), export_backup, import_backup. \
                 Pass daily=true to merge same-day sessions before statistics, analysis or export."
                    .into(),
            ),
        }
    }
}
