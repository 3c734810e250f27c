//! Model Context Protocol (MCP) implementation.
//!
//! This module provides the protocol layer shared by every transport,
//! including JSON-RPC message handling, registries, and dispatch.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `server` - Per-session dispatcher over the registries
//! - `transport` - Stdio transport
//! - `handler` - Tool registry and argument helpers
//! - `resources` - Static resources and URI templates
//! - `prompts` - Prompt templates with argument completion

pub mod handler;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use handler::McpHandler;
pub use prompts::PromptRegistry;
pub use protocol::*;
pub use resources::ResourceRegistry;
pub use server::McpServer;
pub use transport::{StdioTransport, Transport};
