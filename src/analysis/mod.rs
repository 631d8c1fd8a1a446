//! Narrative analysis
//!
//! Builds a prompt from the summary statistics and recent entries, asks an
//! [`AnalysisProvider`] for a JSON report and parses it leniently. Any
//! failure (no API key, transport, HTTP status, unparseable reply) degrades
//! to a deterministic report computed from the summary alone.

pub mod client;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use client::{AnalysisProvider, OpenAiClient};

use crate::metrics::{round2, total, Summary};
use crate::models::Entry;

/// Number of entries quoted in the prompt
pub const RECENT_ENTRY_COUNT: usize = 10;

/// Goal progress at or above this percentage counts as on track
pub const ON_TRACK_PERCENTAGE: f64 = 70.0;

pub const SYSTEM_PROMPT: &str = "You are an Instagram growth specialist. \
You give concrete, actionable advice grounded in the data you are shown.";

const MISSING_SUMMARY: &str = "No summary could be extracted from the analysis.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// What kind of target a goal sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Total follower growth
    Follower,
    /// Total likes
    Engagement,
    /// Mean follow-back rate
    GrowthRate,
}

impl GoalKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "follower" | "followers" => Some(GoalKind::Follower),
            "engagement" => Some(GoalKind::Engagement),
            "growth_rate" | "growth-rate" => Some(GoalKind::GrowthRate),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            GoalKind::Follower => "follower count",
            GoalKind::Engagement => "engagement",
            GoalKind::GrowthRate => "growth rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub kind: GoalKind,
    pub value: f64,
    pub timeframe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub current: f64,
    pub target: f64,
    pub percentage: f64,
    pub on_track: bool,
}

/// Input to [`analyze`]. Entries are expected newest first.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub entries: Vec<Entry>,
    pub summary: Summary,
    pub goal: Option<Goal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub neutral: Vec<String>,
}

/// Narrative content of a report, independent of where it came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFields {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub trends: Trends,
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub source: ReportSource,
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub trends: Trends,
    pub next_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_progress: Option<GoalProgress>,
}

impl Report {
    pub fn new(source: ReportSource, fields: ReportFields, goal_progress: Option<GoalProgress>) -> Self {
        Self {
            source,
            summary: fields.summary,
            insights: fields.insights,
            recommendations: fields.recommendations,
            trends: fields.trends,
            next_actions: fields.next_actions,
            goal_progress,
        }
    }
}

/// User prompt for the completion call
pub fn build_prompt(request: &AnalysisRequest) -> String {
    let s = &request.summary;
    let mut prompt = format!(
        "Analyze the following Instagram growth data and write a detailed report in English.\n\n\
         ## Summary statistics\n\
         - Days recorded: {}\n\
         - Total follower growth: {}\n\
         - Average follower growth: {} per day\n\
         - Average follow-back rate: {}%\n\
         - Total operation time: {} minutes\n\
         - Total likes: {}\n\n\
         ## Most recent entries\n",
        s.total_records,
        s.total_follower_growth,
        s.average_follower_growth,
        s.average_follow_back_rate,
        s.total_operation_time,
        s.total_likes,
    );

    for (i, e) in request.entries.iter().take(RECENT_ENTRY_COUNT).enumerate() {
        prompt.push_str(&format!(
            "{}. Date: {}\n   - Follower growth: {}\n   - Follow-back rate: {}%\n   - Operation time: {} minutes\n   - Likes: {}\n",
            i + 1,
            e.date,
            e.metrics.follower_growth,
            e.metrics.follow_back_rate,
            e.operation_time_minutes,
            e.likes,
        ));
    }

    if let Some(ref goal) = request.goal {
        prompt.push_str(&format!(
            "\n## Goal\n- Type: {}\n- Target: {}\n- Timeframe: {}\n",
            goal.kind.label(),
            goal.value,
            goal.timeframe,
        ));
    }

    prompt.push_str(
        "\n## What to cover\n\
         1. Overall performance assessment\n\
         2. Positive and negative trends\n\
         3. Concrete insights from the data (3-5)\n\
         4. Recommended improvements (3-5)\n\
         5. Specific next steps (3)\n\n\
         Answer with JSON in exactly this shape:\n\
         {\n\
           \"summary\": \"2-3 sentence overall assessment\",\n\
           \"insights\": [\"...\"],\n\
           \"recommendations\": [\"...\"],\n\
           \"trends\": { \"positive\": [\"...\"], \"negative\": [\"...\"], \"neutral\": [\"...\"] },\n\
           \"next_actions\": [\"...\", \"...\", \"...\"]\n\
         }",
    );

    prompt
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the first `{ ... }` block of a reply.
///
/// Missing or mistyped arrays become empty; a missing summary becomes a
/// placeholder. Only a reply with no parseable object is an error.
pub fn parse_reply(reply: &str) -> Result<ReportFields, AnalysisError> {
    let start = reply
        .find('{')
        .ok_or_else(|| AnalysisError::MalformedResponse("no JSON object in reply".to_string()))?;
    let end = reply
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AnalysisError::MalformedResponse("unterminated JSON object in reply".to_string()))?;

    let parsed: Value = serde_json::from_str(&reply[start..=end])
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let summary = parsed
        .get("summary")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(MISSING_SUMMARY)
        .to_string();

    let trends = parsed.get("trends");
    let next_actions = parsed.get("next_actions").or_else(|| parsed.get("nextActions"));

    Ok(ReportFields {
        summary,
        insights: string_list(parsed.get("insights")),
        recommendations: string_list(parsed.get("recommendations")),
        trends: Trends {
            positive: string_list(trends.and_then(|t| t.get("positive"))),
            negative: string_list(trends.and_then(|t| t.get("negative"))),
            neutral: string_list(trends.and_then(|t| t.get("neutral"))),
        },
        next_actions: string_list(next_actions),
    })
}

/// Progress toward a goal over the given entries
pub fn goal_progress(entries: &[Entry], goal: &Goal) -> GoalProgress {
    let current = match goal.kind {
        GoalKind::Follower => total(entries.iter().map(|e| e.metrics.follower_growth)) as f64,
        GoalKind::Engagement => total(entries.iter().map(|e| e.likes)) as f64,
        GoalKind::GrowthRate => {
            if entries.is_empty() {
                0.0
            } else {
                entries.iter().map(|e| e.metrics.follow_back_rate).sum::<f64>() / entries.len() as f64
            }
        }
    };

    let percentage = if goal.value != 0.0 {
        round2(current / goal.value * 100.0)
    } else {
        0.0
    };

    GoalProgress {
        current: round2(current),
        target: goal.value,
        percentage,
        on_track: percentage >= ON_TRACK_PERCENTAGE,
    }
}

/// Deterministic report computed from the summary alone
pub fn fallback(summary: &Summary) -> ReportFields {
    ReportFields {
        summary: format!(
            "Over {} recorded days, followers grew by {}. Average follower growth is {} per day.",
            summary.total_records, summary.total_follower_growth, summary.average_follower_growth
        ),
        insights: vec![
            format!("Average follow-back rate is {}%", summary.average_follow_back_rate),
            format!("Total operation time is {} minutes", summary.total_operation_time),
            format!("Total likes given: {}", summary.total_likes),
        ],
        recommendations: vec![
            "On days with a low follow-back rate, revisit how target users are selected".to_string(),
            "Study what was done on the best-performing day and repeat it".to_string(),
            "Review the data regularly to keep track of trends".to_string(),
        ],
        trends: Trends {
            positive: vec!["Sessions are being recorded consistently".to_string()],
            negative: Vec::new(),
            neutral: Vec::new(),
        },
        next_actions: vec![
            "Review this week's data and list what to improve".to_string(),
            "Find the weekdays and times with the highest follow-back rate".to_string(),
            "Set a goal and plan sessions around it".to_string(),
        ],
    }
}

/// Produce a report, falling back to the local one on any provider failure
pub async fn analyze(provider: &dyn AnalysisProvider, request: &AnalysisRequest) -> Report {
    let progress = request.goal.as_ref().map(|g| goal_progress(&request.entries, g));
    let prompt = build_prompt(request);

    let reply = provider.complete(SYSTEM_PROMPT, &prompt).await;
    match reply.and_then(|text| parse_reply(&text)) {
        Ok(fields) => {
            tracing::info!(entries = request.entries.len(), "AI analysis completed");
            Report::new(ReportSource::Ai, fields, progress)
        }
        Err(e) => {
            tracing::warn!(error = %e, "AI analysis unavailable, using fallback report");
            Report::new(ReportSource::Fallback, fallback(&request.summary), progress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::entry;
    use crate::metrics::overall_statistics;
    use async_trait::async_trait;

    /// Replies with a fixed text, or fails as if the key were missing
    struct StubProvider(Option<String>);

    #[async_trait]
    impl AnalysisProvider for StubProvider {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AnalysisError> {
            self.0.clone().ok_or(AnalysisError::MissingApiKey)
        }
    }

    fn request(goal: Option<Goal>) -> AnalysisRequest {
        let mut entries = vec![
            entry(2, "2024-01-02", (110, 130), (60, 80)),
            entry(1, "2024-01-01", (100, 110), (50, 60)),
        ];
        entries[0].likes = 40;
        entries[1].likes = 60;
        let summary = overall_statistics(&entries);
        AnalysisRequest { entries, summary, goal }
    }

    #[test]
    fn test_prompt_mentions_stats_and_goal() {
        let req = request(Some(Goal {
            kind: GoalKind::Follower,
            value: 100.0,
            timeframe: "1 month".to_string(),
        }));
        let prompt = build_prompt(&req);
        assert!(prompt.contains("Total follower growth: 30"));
        assert!(prompt.contains("1. Date: 2024-01-02"));
        assert!(prompt.contains("- Timeframe: 1 month"));
    }

    #[test]
    fn test_prompt_limits_recent_entries() {
        let entries: Vec<Entry> = (1..=15)
            .map(|i| entry(i, &format!("2024-01-{:02}", i), (0, 1), (0, 0)))
            .collect();
        let summary = overall_statistics(&entries);
        let prompt = build_prompt(&AnalysisRequest { entries, summary, goal: None });
        assert!(prompt.contains("10. Date:"));
        assert!(!prompt.contains("11. Date:"));
    }

    #[test]
    fn test_parse_reply_wrapped_in_prose() {
        let reply = "Here is the analysis:\n```json\n{\"summary\": \"Solid week\", \"insights\": [\"a\", \"b\"], \
                     \"trends\": {\"positive\": [\"up\"]}, \"nextActions\": [\"post more\"]}\n```\nGood luck!";
        let fields = parse_reply(reply).unwrap();
        assert_eq!(fields.summary, "Solid week");
        assert_eq!(fields.insights, vec!["a", "b"]);
        assert!(fields.recommendations.is_empty());
        assert_eq!(fields.trends.positive, vec!["up"]);
        assert!(fields.trends.negative.is_empty());
        assert_eq!(fields.next_actions, vec!["post more"]);
    }

    #[test]
    fn test_parse_reply_missing_summary_and_bad_arrays() {
        let fields = parse_reply("{\"insights\": \"not a list\"}").unwrap();
        assert_eq!(fields.summary, MISSING_SUMMARY);
        assert!(fields.insights.is_empty());
    }

    #[test]
    fn test_parse_reply_rejects_garbage() {
        assert!(parse_reply("no json here").is_err());
        assert!(parse_reply("} backwards {").is_err());
        assert!(parse_reply("{not: valid}").is_err());
    }

    #[test]
    fn test_goal_progress_kinds() {
        let req = request(None);

        let followers = goal_progress(
            &req.entries,
            &Goal { kind: GoalKind::Follower, value: 40.0, timeframe: "1w".to_string() },
        );
        assert_eq!(followers.current, 30.0);
        assert_eq!(followers.percentage, 75.0);
        assert!(followers.on_track);

        let likes = goal_progress(
            &req.entries,
            &Goal { kind: GoalKind::Engagement, value: 200.0, timeframe: "1w".to_string() },
        );
        assert_eq!(likes.current, 100.0);
        assert_eq!(likes.percentage, 50.0);
        assert!(!likes.on_track);

        // Rates 100 and 100
        let rate = goal_progress(
            &req.entries,
            &Goal { kind: GoalKind::GrowthRate, value: 0.0, timeframe: "1w".to_string() },
        );
        assert_eq!(rate.current, 100.0);
        assert_eq!(rate.percentage, 0.0);
    }

    #[tokio::test]
    async fn test_analyze_uses_ai_reply() {
        let provider = StubProvider(Some("{\"summary\": \"Growing\", \"next_actions\": [\"x\"]}".to_string()));
        let report = analyze(&provider, &request(None)).await;
        assert_eq!(report.source, ReportSource::Ai);
        assert_eq!(report.summary, "Growing");
        assert_eq!(report.next_actions, vec!["x"]);
        assert!(report.goal_progress.is_none());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_garbage() {
        let provider = StubProvider(Some("I cannot help with that.".to_string()));
        let req = request(Some(Goal {
            kind: GoalKind::Follower,
            value: 30.0,
            timeframe: "1w".to_string(),
        }));
        let report = analyze(&provider, &req).await;
        assert_eq!(report.source, ReportSource::Fallback);
        assert!(report.summary.contains("followers grew by 30"));
        assert_eq!(report.insights.len(), 3);
        assert_eq!(report.goal_progress.unwrap().percentage, 100.0);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_without_key() {
        let report = analyze(&StubProvider(None), &request(None)).await;
        assert_eq!(report.source, ReportSource::Fallback);
        assert_eq!(report, Report::new(ReportSource::Fallback, fallback(&request(None).summary), None));
    }
}
