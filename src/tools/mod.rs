//! MCP tool implementations.
//!
//! The demo catalog, organized by concern:
//!
//! - `math` - Arithmetic and statistics (2 tools)
//! - `files` - Mock file system exploration (1 tool)
//! - `swapi` - Star Wars API lookups (1 tool)
//! - `fetch` - Generic external API fetching (1 tool)

pub mod fetch;
pub mod files;
pub mod math;
pub mod swapi;

use reqwest::Client;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::mcp::handler::McpHandler;

/// Register all tools with the handler.
pub fn register_all_tools(handler: &mut McpHandler) -> Result<()> {
    let client = http_client()?;

    // Math tools (2)
    handler.register(math::AddTool::new());
    handler.register(math::CalculateMetricsTool::new());

    // File tools (1)
    handler.register(files::ListFilesTool::new());

    // External lookup tools (2)
    handler.register(swapi::StarWarsInfoTool::new(client.clone()));
    handler.register(fetch::FetchDataTool::new(client));

    Ok(())
}

/// Shared outbound HTTP client for the lookup tools.
fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(format!("{}/{} (rust)", crate::SERVER_NAME, crate::VERSION))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))
}
