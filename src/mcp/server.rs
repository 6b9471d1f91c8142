//! MCP server implementation for the market-data tool service.
//!
//! Two pieces live here:
//!
//! - [`Dispatcher`] — turns one line of input text into exactly one line
//!   of output text: parse, route, serialise. Stateless between lines;
//!   the only thing it holds is the tool catalog and the invoker.
//! - [`McpServer`] — drives a dispatcher over the stdio transport with
//!   graceful shutdown handling.
//!
//! Requests are processed strictly sequentially: one line in, a full
//! dispatch-and-normalise cycle, one line out. Concurrent connections
//! would each own their own dispatcher/invoker pair; the tool catalog
//! is immutable and safe to share.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::mcp::protocol::{
    parse_request, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Method, RequestId,
    DEFAULT_REQUEST_ID, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::StdioTransport;
use crate::provider::MarketDataProvider;
use crate::tools::{tool_definitions, ToolDefinition, ToolInvoker};

/// Emitted when a response cannot be serialised; keeps the one-line-out
/// guarantee even on the last-resort path.
const ENCODE_FALLBACK: &str = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"Internal error: response serialisation failed"}}"#;

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the tools/call request.
///
/// Both fields default: a missing name is rejected downstream as an
/// unknown tool, and absent arguments are an empty mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    #[serde(default)]
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// The protocol dispatcher: one line in, one line out.
pub struct Dispatcher {
    /// Immutable tool catalog, built once at construction.
    tools: Vec<ToolDefinition>,
    /// Executes tools/call requests.
    invoker: ToolInvoker,
}

impl Dispatcher {
    /// Creates a dispatcher backed by the given capability provider.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            tools: tool_definitions(),
            invoker: ToolInvoker::new(provider),
        }
    }

    /// Processes one raw input line into one serialised response line.
    ///
    /// This never fails: every failure mode maps to a protocol error
    /// response, and serialisation itself has a static fallback.
    pub async fn process_message(&self, raw: &str) -> String {
        let request = match parse_request(raw) {
            Ok(request) => request,
            Err(error) => return encode(&error),
        };

        tracing::debug!(method = %request.method, id = %request.id, "dispatching request");

        match self.dispatch(request).await {
            Ok(response) => encode(&response),
            Err(error) => encode(&error),
        }
    }

    /// Routes a parsed request to its handler.
    async fn dispatch(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let JsonRpcRequest { id, method, params } = request;

        match Method::resolve(&method) {
            Some(Method::Initialize) => Ok(Self::handle_initialize(id)),
            Some(Method::ListTools) => Ok(self.handle_tools_list(id)),
            Some(Method::CallTool) => self.handle_tools_call(id, params).await,
            None => Err(JsonRpcError::method_not_found(id, &method)),
        }
    }

    /// Handles the initialize request. Side-effect-free; the server is
    /// usable with or without it.
    fn handle_initialize(id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": ServerInfo::default(),
            }),
        )
    }

    /// Handles the tools/list request (and its legacy alias).
    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "tools": self.tools,
            }),
        )
    }

    /// Handles the tools/call request (and its legacy alias).
    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Value,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::parse_error(id.clone(), e))?;

        let result = self
            .invoker
            .call_tool(&params.name, &params.arguments)
            .await
            .map_err(|e| JsonRpcError::tool_execution_failed(id.clone(), e))?;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(id.clone(), "failed to serialise result")
        })?;

        Ok(JsonRpcResponse::success(id, result_value))
    }
}

/// Serialises a response message to one line, with a static fallback.
fn encode<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialise response");
        ENCODE_FALLBACK.to_string()
    })
}

/// The MCP server: a dispatcher driven over stdio.
pub struct McpServer {
    /// The transport layer.
    transport: StdioTransport,
    /// The per-connection dispatcher.
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Creates a new MCP server with the given capability provider.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            transport: StdioTransport::new(),
            dispatcher: Dispatcher::new(provider),
        }
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let line = match line_result {
            Ok(Some(line)) => line,
            Ok(None) => {
                // EOF - client closed the stream
                return Ok(true);
            }
            Err(e) => {
                // A single bad interaction (e.g. invalid UTF-8 on the
                // stream) must not terminate the process: answer with a
                // generic internal error and keep serving.
                tracing::warn!(error = %e, "transport read failed");
                let error = JsonRpcError::internal_error(DEFAULT_REQUEST_ID, e);
                self.transport.write_line(&encode(&error)).await?;
                return Ok(false);
            }
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        let reply = self.dispatcher.process_message(&line).await;
        self.transport.write_line(&reply).await?;

        Ok(false)
    }
}
