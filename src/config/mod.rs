//! Configuration management for the Star Wars MCP Server.

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments for the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "starwars-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Session-multiplexed MCP server with Streamable HTTP and legacy SSE transports")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "http", env = "STARWARS_MCP_TRANSPORT")]
    pub transport: Transport,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "STARWARS_MCP_PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "STARWARS_MCP_DEBUG")]
    pub debug: bool,

    /// Enable production protections (host validation, origin checks, auth)
    #[arg(long, env = "STARWARS_MCP_PRODUCTION")]
    pub production: bool,

    /// Comma-separated domains allowed as Host/Origin in production
    #[arg(
        long,
        default_value = "localhost:3000,127.0.0.1:3000",
        env = "STARWARS_MCP_ALLOWED_DOMAINS"
    )]
    pub allowed_domains: String,

    /// Bearer token required on protocol endpoints in production
    #[arg(long, env = "STARWARS_MCP_AUTH_TOKEN")]
    pub auth_token: Option<String>,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    #[default]
    Http,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// Production protections enabled
    pub production: bool,
    /// Domains accepted as Host/Origin when production protections are on
    pub allowed_domains: Vec<String>,
    /// Bearer token for protocol endpoints
    pub auth_token: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            port: args.port,
            debug: args.debug,
            production: args.production,
            allowed_domains: split_domains(&args.allowed_domains),
            auth_token: args.auth_token,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            port: 3000,
            debug: false,
            production: false,
            allowed_domains: vec![
                "localhost:3000".to_string(),
                "127.0.0.1:3000".to_string(),
            ],
            auth_token: None,
        }
    }
}

fn split_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_default() {
        assert_eq!(Transport::default(), Transport::Http);
    }

    #[test]
    fn test_transport_serialization() {
        let transports = [
            (Transport::Stdio, "\"stdio\""),
            (Transport::Http, "\"http\""),
        ];

        for (transport, expected) in &transports {
            let json = serde_json::to_string(transport).unwrap();
            assert_eq!(json, *expected);
        }
    }

    #[test]
    fn test_transport_deserialization() {
        let stdio: Transport = serde_json::from_str("\"stdio\"").unwrap();
        assert_eq!(stdio, Transport::Stdio);

        let http: Transport = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(http, Transport::Http);
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.port, 3000);
        assert!(!config.debug);
        assert!(!config.production);
        assert_eq!(
            config.allowed_domains,
            vec!["localhost:3000".to_string(), "127.0.0.1:3000".to_string()]
        );
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            port: 8080,
            production: true,
            ..Config::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"transport\":\"http\""));
        assert!(json.contains("\"port\":8080"));
        assert!(json.contains("\"production\":true"));
    }

    #[test]
    fn test_args_to_config() {
        let args = Args {
            transport: Transport::Http,
            port: 4000,
            debug: true,
            production: true,
            allowed_domains: "mcp.example.com, api.example.com ,".to_string(),
            auth_token: Some("secret-token".to_string()),
        };

        let config: Config = args.into();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.port, 4000);
        assert!(config.debug);
        assert!(config.production);
        assert_eq!(
            config.allowed_domains,
            vec!["mcp.example.com".to_string(), "api.example.com".to_string()]
        );
        assert_eq!(config.auth_token, Some("secret-token".to_string()));
    }

    #[test]
    fn test_split_domains_empty() {
        assert!(split_domains("").is_empty());
        assert!(split_domains(" , ,").is_empty());
    }
}
