//! Code Health MCP Server
//!
//! Exposes CodeScene Code Health analysis to AI agents via the MCP protocol.
//!
//! ## Tools
//!
//! - `code_health_score` / `code_health_review` - Code Health of a single file
//! - `pre_commit_code_health_safeguard` - review staged and modified files
//! - `analyze_change_set` - branch-level review against a base ref
//! - `code_health_auto_refactor` - ACE refactoring of one function
//! - `select_project` plus technical debt and ownership tools - CodeScene project data
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "codescene": {
//!       "command": "cs-mcp",
//!       "env": { "CS_ACCESS_TOKEN": "<token>" }
//!     }
//!   }
//! }
//! ```

pub mod analysis;
pub mod delta;
pub mod deps;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod service;
pub mod telemetry;
pub mod tools;
pub mod version;

use anyhow::Result;
use codehealth_config::Config;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

pub use deps::ToolDeps;
pub use service::CodeHealthService;

pub async fn main_entry() -> Result<()> {
    // Logging goes to stderr only (stdout is for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .init();

    log::info!("Starting Code Health MCP server v{}", version::CURRENT_VERSION);

    let deps = ToolDeps::from_config(Config::from_env())?;
    let server = CodeHealthService::new(deps).serve(stdio()).await?;

    server.waiting().await?;

    log::info!("Code Health MCP server stopped");
    Ok(())
}
