//! Instagram Growth Tracker (igtrack)
//!
//! An MCP server for tracking and analyzing Instagram account growth.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use igtrack::build_info;
use igtrack::config::Settings;
use igtrack::db::{self, Database};
use igtrack::mcp::IgTrackService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the MCP channel
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("igtrack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let settings = Settings::from_env();
    eprintln!("Database path: {}", settings.database_path.display());
    eprintln!("Owner: {}", settings.owner);
    if settings.ai.api_key.is_none() {
        eprintln!("IGTRACK_OPENAI_API_KEY not set; analysis will use the built-in report");
    }

    if let Some(parent) = settings.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = Database::open_migrated(&settings.database_path)?;
    let version = database.with_conn(db::migrations::get_schema_version)?;
    eprintln!("Database schema version: {}", version);

    let service = IgTrackService::new(settings, database);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
