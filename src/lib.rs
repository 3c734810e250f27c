//! Star Wars MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server demonstrating session and transport
//! management over HTTP, with a demo catalog of tools, resources, and prompts.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Protocol types, per-session server, handler
//!    registries, stdio transport
//! 2. **Session Layer** (`session`) - Streamable HTTP and legacy SSE sessions
//!    plus the registries that correlate them
//! 3. **HTTP Layer** (`http`) - Axum router, session negotiator, security
//!    guards, graceful shutdown
//! 4. **Tools Layer** (`tools`) - The demo tool catalog
//!
//! # Transports
//!
//! - **Streamable HTTP**: one `/mcp` endpoint for both directions, sessions
//!   correlated by the `mcp-session-id` header
//! - **Legacy SSE**: `GET /sse` push stream paired with `POST /messages`,
//!   sessions correlated by query parameter
//! - **Stdio**: newline-delimited JSON-RPC for local clients

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod session;
pub mod tools;

pub use error::{Error, Result};

/// Server name reported in the initialize handshake.
pub const SERVER_NAME: &str = "starwars-mcp-server";

/// Server version reported in the initialize handshake.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
