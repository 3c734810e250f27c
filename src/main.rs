//! Star Wars MCP Server
//!
//! A demo Model Context Protocol (MCP) server with session management over
//! Streamable HTTP, a legacy SSE transport, and a stdio mode.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use starwars_mcp_rs::config::{Args, Config, Transport};
use starwars_mcp_rs::error::Result;
use starwars_mcp_rs::mcp::handler::McpHandler;
use starwars_mcp_rs::mcp::server::McpServer;
use starwars_mcp_rs::mcp::transport::StdioTransport;
use starwars_mcp_rs::mcp::{PromptRegistry, ResourceRegistry};
use starwars_mcp_rs::metrics::Metrics;
use starwars_mcp_rs::{http, tools, SERVER_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up .env before parsing, since the flags have env fallbacks.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging. Stderr keeps the stdio protocol channel clean.
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Build configuration from args
    let config: Config = args.into();

    info!("Star Wars MCP Server v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    // Create MCP handler and register tools
    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler)?;
    info!("Registered {} MCP tools", handler.tool_count());

    let handler = Arc::new(handler);
    let prompts = Arc::new(PromptRegistry::new());
    let resources = Arc::new(ResourceRegistry::new());
    let metrics = Metrics::new();

    // Start the server based on transport mode
    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            let server = McpServer::new(handler, prompts, resources, SERVER_NAME, VERSION);
            let transport = StdioTransport::new();
            server.run(transport).await?;
        }
        Transport::Http => {
            info!("Starting HTTP transport on port {}...", config.port);
            http::start_server(config, metrics, handler, prompts, resources).await?;
        }
    }

    Ok(())
}
