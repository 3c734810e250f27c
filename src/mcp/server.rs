//! MCP server implementation.
//!
//! One `McpServer` is bound per session; it dispatches decoded envelopes to
//! the shared tool, resource, and prompt registries.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::McpHandler;
use crate::mcp::prompts::PromptRegistry;
use crate::mcp::protocol::*;
use crate::mcp::resources::ResourceRegistry;
use crate::mcp::transport::{Message, Transport};
use crate::metrics::Timer;

/// MCP server.
pub struct McpServer {
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    resources: Arc<ResourceRegistry>,
    name: String,
    version: String,
    /// Set once the client sends `notifications/initialized`.
    initialized: AtomicBool,
}

impl McpServer {
    /// Create a new MCP server over shared registries.
    pub fn new(
        handler: Arc<McpHandler>,
        prompts: Arc<PromptRegistry>,
        resources: Arc<ResourceRegistry>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            prompts,
            resources,
            name: name.into(),
            version: version.into(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether the client has completed the initialization handshake.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Run the server with the given transport.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => {
                    let response = self.handle_request(req).await;
                    if outgoing.send(Message::Response(response)).await.is_err() {
                        warn!("Failed to send response, stopping");
                        break;
                    }
                }
                Message::Notification(notif) => {
                    self.handle_notification(notif).await;
                }
                Message::Response(_) => {
                    warn!("Received unexpected response");
                }
            }
        }

        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one decoded envelope. Requests produce a response; notifications
    /// and undecodable bodies that lack an id produce `None`.
    pub async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let has_id = message.get("id").is_some_and(|id| !id.is_null());

        if message.get("method").is_none() {
            return Some(JsonRpcResponse::error(
                RequestId::Null,
                error_codes::INVALID_REQUEST,
                "Invalid Request",
            ));
        }

        if has_id {
            match serde_json::from_value::<JsonRpcRequest>(message) {
                Ok(req) => Some(self.handle_request(req).await),
                Err(e) => Some(JsonRpcResponse::error(
                    RequestId::Null,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                )),
            }
        } else {
            match serde_json::from_value::<JsonRpcNotification>(message) {
                Ok(notif) => {
                    self.handle_notification(notif).await;
                }
                Err(e) => debug!("Ignoring undecodable notification: {}", e),
            }
            None
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {:?})", req.method, req.id);

        let result = match req.method.as_str() {
            // Core
            "initialize" => self.handle_initialize().await,
            "ping" => Ok(serde_json::json!({})),
            // Tools
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(req.params).await,
            // Prompts
            "prompts/list" => self.handle_list_prompts().await,
            "prompts/get" => self.handle_get_prompt(req.params).await,
            // Resources
            "resources/list" => self.handle_list_resources().await,
            "resources/templates/list" => self.handle_list_resource_templates().await,
            "resources/read" => self.handle_read_resource(req.params).await,
            // Completions
            "completion/complete" => self.handle_completion(req.params).await,
            // Unknown
            _ => Err(Error::MethodNotFound(req.method.clone())),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(req.id, value),
            Err(e) => JsonRpcResponse::error(req.id, error_code_for(&e), e.to_string()),
        }
    }

    /// Handle a notification.
    pub async fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                self.initialized.store(true, Ordering::Release);
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                debug!("Client cancelled a request");
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    /// Handle initialize request.
    async fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: true }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: true,
                }),
                prompts: Some(PromptsCapability { list_changed: true }),
                completions: Some(CompletionsCapability {}),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request.
    async fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.handler.list_tools();
        let result = ListToolsResult { tools };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let handler = self
            .handler
            .get_tool(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        let timer = Timer::start();
        let result = handler.execute(params.arguments).await?;
        debug!("Tool {} finished in {}ms", params.name, timer.elapsed_ms());

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list prompts request.
    async fn handle_list_prompts(&self) -> Result<Value> {
        use crate::mcp::prompts::ListPromptsResult;

        let prompts = self.prompts.list();
        let result = ListPromptsResult {
            prompts,
            next_cursor: None,
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle get prompt request.
    async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct GetPromptParams {
            name: String,
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let params: GetPromptParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let result = self.prompts.get(&params.name, &params.arguments)?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list resources request.
    async fn handle_list_resources(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.resources.list())?)
    }

    /// Handle list resource templates request.
    async fn handle_list_resource_templates(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.resources.list_templates())?)
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let read_params: ReadParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let result = self.resources.read(&read_params.uri)?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle completion request.
    async fn handle_completion(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct CompletionParams {
            r#ref: CompletionRef,
            argument: CompletionArgument,
            #[serde(default)]
            context: CompletionContext,
        }

        #[derive(serde::Deserialize)]
        struct CompletionRef {
            r#type: String,
            #[serde(default)]
            uri: Option<String>,
            #[serde(default)]
            name: Option<String>,
        }

        #[derive(serde::Deserialize)]
        struct CompletionArgument {
            name: String,
            value: String,
        }

        #[derive(serde::Deserialize, Default)]
        struct CompletionContext {
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let params: CompletionParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let values = match params.r#ref.r#type.as_str() {
            "ref/prompt" => params.r#ref.name.as_deref().and_then(|name| {
                self.prompts.complete(
                    name,
                    &params.argument.name,
                    &params.argument.value,
                    &params.context.arguments,
                )
            }),
            "ref/resource" => params.r#ref.uri.as_deref().and_then(|uri| {
                self.resources
                    .complete(uri, &params.argument.name, &params.argument.value)
            }),
            other => {
                return Err(Error::InvalidToolArguments(format!(
                    "Unknown completion ref type: {}",
                    other
                )))
            }
        };

        Ok(serde_json::to_value(Completion::from_values(
            values.unwrap_or_default(),
        ))?)
    }
}

/// Map an error to its JSON-RPC code.
fn error_code_for(error: &Error) -> i32 {
    match error {
        Error::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
        Error::InvalidToolArguments(_)
        | Error::MissingPromptArgument(_)
        | Error::ToolNotFound(_)
        | Error::PromptNotFound(_)
        | Error::ResourceNotFound(_) => error_codes::INVALID_PARAMS,
        _ => error_codes::INTERNAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::{get_f64_arg, success_result, ToolHandler};
    use crate::mcp::protocol::{Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct AddTool;

    #[async_trait]
    impl ToolHandler for AddTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "add".to_string(),
                description: "Add two numbers".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
            let a = get_f64_arg(&args, "a")?;
            let b = get_f64_arg(&args, "b")?;
            Ok(success_result(format!("{}", a + b)))
        }
    }

    fn test_server() -> McpServer {
        let mut handler = McpHandler::new();
        handler.register(AddTool);
        McpServer::new(
            Arc::new(handler),
            Arc::new(PromptRegistry::new()),
            Arc::new(ResourceRegistry::new()),
            "starwars-mcp-server",
            "1.0.0",
        )
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = test_server();
        let response = server.handle_request(request("initialize", None)).await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "starwars-mcp-server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
    }

    #[tokio::test]
    async fn test_ping() {
        let server = test_server();
        let response = server.handle_request(request("ping", None)).await;

        assert_eq!(response.result, Some(json!({})));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let server = test_server();

        let listed = server.handle_request(request("tools/list", None)).await;
        let tools = listed.result.unwrap();
        assert_eq!(tools["tools"][0]["name"], "add");

        let called = server
            .handle_request(request(
                "tools/call",
                Some(json!({"name": "add", "arguments": {"a": 2, "b": 3}})),
            ))
            .await;
        let result = called.result.unwrap();
        assert_eq!(result["content"][0]["text"], "5");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = test_server();
        let response = server
            .handle_request(request("tools/call", Some(json!({"name": "warp"}))))
            .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::INVALID_PARAMS);
        assert!(error.message.contains("warp"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = test_server();
        let response = server.handle_request(request("tools/destroy", None)).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resources_read_via_dispatch() {
        let server = test_server();
        let response = server
            .handle_request(request(
                "resources/read",
                Some(json!({"uri": "greeting://Luke"})),
            ))
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["contents"][0]["text"], "Hello, Luke!");
    }

    #[tokio::test]
    async fn test_completion_for_prompt_argument() {
        let server = test_server();
        let response = server
            .handle_request(request(
                "completion/complete",
                Some(json!({
                    "ref": {"type": "ref/prompt", "name": "code-review"},
                    "argument": {"name": "language", "value": "ru"}
                })),
            ))
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["completion"]["values"], json!(["rust"]));
    }

    #[tokio::test]
    async fn test_completion_with_context() {
        let server = test_server();
        let response = server
            .handle_request(request(
                "completion/complete",
                Some(json!({
                    "ref": {"type": "ref/prompt", "name": "team-standup"},
                    "argument": {"name": "teamMember", "value": "a"},
                    "context": {"arguments": {"department": "engineering"}}
                })),
            ))
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["completion"]["values"], json!(["Alice"]));
    }

    #[tokio::test]
    async fn test_handle_message_notification_returns_none() {
        let server = test_server();
        assert!(!server.is_initialized());

        let outcome = server
            .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;

        assert!(outcome.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_handle_message_invalid_body() {
        let server = test_server();
        let response = server
            .handle_message(json!({"jsonrpc": "2.0", "id": 1}))
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::INVALID_REQUEST);
        assert_eq!(response.id, RequestId::Null);
    }
}
