//! Runtime configuration
//!
//! Everything is read from environment variables; there is no config file.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OWNER: &str = "local";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

/// Settings for the AI analysis client
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Owner scope applied to every store operation
    pub owner: String,
    pub ai: AiSettings,
}

impl Settings {
    /// Load settings from `IGTRACK_*` environment variables
    pub fn from_env() -> Self {
        let owner = non_empty_var("IGTRACK_USER").unwrap_or_else(|| DEFAULT_OWNER.to_string());

        let timeout_secs = non_empty_var("IGTRACK_AI_TIMEOUT_SEC")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_AI_TIMEOUT_SECS);

        let ai = AiSettings {
            api_key: non_empty_var("IGTRACK_OPENAI_API_KEY"),
            model: non_empty_var("IGTRACK_OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            endpoint: non_empty_var("IGTRACK_OPENAI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Self {
            database_path: database_path(),
            owner,
            ai,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Database path from `IGTRACK_DATABASE_PATH`, or `<project>/data/igtrack.db`
pub fn database_path() -> PathBuf {
    if let Some(path) = non_empty_var("IGTRACK_DATABASE_PATH") {
        return PathBuf::from(path);
    }

    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("igtrack.db");
    path
}
