//! Generic external API fetcher.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::handler::{
    error_result, get_optional_string_arg, get_string_arg, success_result, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};

/// External API fetcher tool.
pub struct FetchDataTool {
    client: Client,
}

impl FetchDataTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(
        &self,
        method: Method,
        url: &str,
        headers: Option<serde_json::Map<String, Value>>,
        body: Option<String>,
    ) -> Result<String> {
        let mut request = self.client.request(method, url);

        let mut has_content_type = false;
        if let Some(headers) = &headers {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    if name.eq_ignore_ascii_case("content-type") {
                        has_content_type = true;
                    }
                    request = request.header(name, value);
                }
            }
        }
        if !has_content_type {
            request = request.header(CONTENT_TYPE, "application/json");
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            return Err(Error::api(status.as_u16(), status_text, "request failed"));
        }

        let text = response.text().await?;
        Ok(format!("Status: {}\nResponse: {}", status.as_u16(), text))
    }
}

#[async_trait]
impl ToolHandler for FetchDataTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "fetch-data".to_string(),
            description: "Fetch data from external APIs with error handling".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "API endpoint URL"
                    },
                    "method": {
                        "type": "string",
                        "enum": ["GET", "POST", "PUT", "DELETE"],
                        "default": "GET"
                    },
                    "headers": {
                        "type": "object",
                        "additionalProperties": {"type": "string"},
                        "description": "HTTP headers"
                    },
                    "body": {
                        "type": "string",
                        "description": "Request body (JSON string)"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let url = get_string_arg(&args, "url")?;
        let method =
            get_optional_string_arg(&args, "method").unwrap_or_else(|| "GET".to_string());
        let headers = args.get("headers").and_then(Value::as_object).cloned();
        let body = get_optional_string_arg(&args, "body");

        let method = match method.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            other => {
                return Err(Error::InvalidToolArguments(format!(
                    "Unknown method: {}",
                    other
                )))
            }
        };

        // Failures surface in-band so the caller sees what went wrong.
        match self.fetch(method, &url, headers, body).await {
            Ok(text) => Ok(success_result(text)),
            Err(e) => {
                let message = match &e {
                    Error::Api {
                        status,
                        status_text,
                        ..
                    } => format!("HTTP {}: {}", status, status_text),
                    other => other.to_string(),
                };
                Ok(error_result(format!("Error: {}", message)))
            }
        }
    }
}
