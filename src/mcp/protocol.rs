//! JSON-RPC 2.0 message types for the MCP wire protocol.
//!
//! This module defines the messages exchanged with AI-assistant clients.
//! All messages follow the JSON-RPC 2.0 convention: one JSON object per
//! line, carrying a method name, parameters, and a correlation id.
//!
//! # Compatibility Constraints
//!
//! Older client integrations predate the `tools/list` / `tools/call`
//! method names and send `mcp:list-tools` / `mcp:call-tool` instead. Both
//! spellings must resolve to the same handlers. The same clients also
//! expect error responses to carry a numeric id even when the request id
//! could not be recovered, so parse failures fall back to id `1` rather
//! than the strict-JSON-RPC `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-01";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "finance-data-mcp";

/// Request id used when the client's id cannot be recovered from the
/// input line. Legacy behaviour: older clients expect `1` here.
pub const DEFAULT_REQUEST_ID: RequestId = RequestId::Number(1);

/// A JSON-RPC 2.0 request id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request id.
    Number(i64),
    /// String request id.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// The method surface, resolved once per request.
///
/// Each variant maps to exactly one handler; the legacy `mcp:` aliases are
/// extra routing-table entries, never special-cased in handler bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Capability negotiation. Side-effect-free.
    Initialize,
    /// List the tool catalog.
    ListTools,
    /// Invoke a named tool.
    CallTool,
}

impl Method {
    /// Resolves a method string to a handler. Exact, case-sensitive match.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "tools/list" | "mcp:list-tools" => Some(Self::ListTools),
            "tools/call" | "mcp:call-tool" => Some(Self::CallTool),
            _ => None,
        }
    }
}

/// A decoded request envelope.
///
/// The envelope is deliberately loose: a missing `method` becomes the
/// empty string (rejected later as method-not-found) and a missing or
/// malformed `id` becomes [`DEFAULT_REQUEST_ID`].
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Correlation id echoed back in the response.
    pub id: RequestId,
    /// The method to invoke.
    pub method: String,
    /// Parameters for the method. Defaults to an empty object.
    pub params: Value,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request id this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// The JSON-RPC error codes this server emits. No other codes exist on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Input line is not valid structured data.
    ParseError,
    /// The method string is not in the routing table.
    MethodNotFound,
    /// Dispatch failure: unknown tool, missing argument, or any
    /// unexpected error during dispatch or transport.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound => -32601,
            Self::InternalError => -32603,
        }
    }
}

/// A JSON-RPC 2.0 error object. Carries only code and message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,
}

/// A JSON-RPC 2.0 error response.
///
/// The id is always present; see [`DEFAULT_REQUEST_ID`] for the fallback
/// used when the request id could not be recovered.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request id this error corresponds to, or the default fallback.
    pub id: RequestId,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    pub fn new(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: JsonRpcErrorData {
                code: code.code(),
                message: message.into(),
            },
        }
    }

    /// Creates a parse error response.
    #[must_use]
    pub fn parse_error(id: RequestId, detail: impl std::fmt::Display) -> Self {
        Self::new(id, ErrorCode::ParseError, format!("Parse error: {detail}"))
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            id,
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// Creates a tool execution error response.
    #[must_use]
    pub fn tool_execution_failed(id: RequestId, detail: impl std::fmt::Display) -> Self {
        Self::new(
            id,
            ErrorCode::InternalError,
            format!("Tool execution failed: {detail}"),
        )
    }

    /// Creates a generic internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, detail: impl std::fmt::Display) -> Self {
        Self::new(
            id,
            ErrorCode::InternalError,
            format!("Internal error: {detail}"),
        )
    }
}

/// Recovers the request id from a parsed value, falling back to the
/// default when absent, `null`, or of an unexpected type.
fn recover_id(value: &Value) -> RequestId {
    match value.get("id") {
        Some(Value::Number(n)) => n
            .as_i64()
            .map_or(DEFAULT_REQUEST_ID, RequestId::Number),
        Some(Value::String(s)) => RequestId::String(s.clone()),
        _ => DEFAULT_REQUEST_ID,
    }
}

/// Parses one line of input into a request envelope.
///
/// # Errors
///
/// Returns a `-32700` error response when the line is not valid JSON or
/// is not a JSON object. The error carries the best-effort recovered id.
pub fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcError> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| JsonRpcError::parse_error(DEFAULT_REQUEST_ID, e))?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcError::parse_error(
            recover_id(&value),
            "expected a JSON object",
        ));
    };

    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let params = obj
        .get("params")
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    Ok(JsonRpcRequest {
        id: recover_id(&value),
        method,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "tools/list"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn parse_missing_id_falls_back_to_default() {
        let json = r#"{"jsonrpc": "2.0", "method": "tools/list"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, DEFAULT_REQUEST_ID);
    }

    #[test]
    fn parse_null_id_falls_back_to_default() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, DEFAULT_REQUEST_ID);
    }

    #[test]
    fn parse_missing_method_yields_empty_string() {
        let json = r#"{"jsonrpc": "2.0", "id": 4}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.method, "");
    }

    #[test]
    fn parse_missing_params_defaults_to_empty_object() {
        let json = r#"{"jsonrpc": "2.0", "id": 5, "method": "tools/list"}"#;
        let req = parse_request(json).unwrap();
        assert!(req.params.as_object().is_some_and(serde_json::Map::is_empty));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_request("not valid json").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert_eq!(err.id, DEFAULT_REQUEST_ID);
    }

    #[test]
    fn parse_non_object_is_parse_error() {
        let err = parse_request("42").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert_eq!(err.id, DEFAULT_REQUEST_ID);
    }

    #[test]
    fn method_resolution_canonical_and_legacy() {
        assert_eq!(Method::resolve("initialize"), Some(Method::Initialize));
        assert_eq!(Method::resolve("tools/list"), Some(Method::ListTools));
        assert_eq!(Method::resolve("mcp:list-tools"), Some(Method::ListTools));
        assert_eq!(Method::resolve("tools/call"), Some(Method::CallTool));
        assert_eq!(Method::resolve("mcp:call-tool"), Some(Method::CallTool));
        assert_eq!(Method::resolve("ping"), None);
        // Case-sensitive, exact matches only
        assert_eq!(Method::resolve("Tools/List"), None);
        assert_eq!(Method::resolve("tools/list "), None);
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "unknown/method");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
    }

    #[test]
    fn error_response_carries_only_code_and_message() {
        let error = JsonRpcError::internal_error(DEFAULT_REQUEST_ID, "boom");
        let value = serde_json::to_value(&error).unwrap();
        let keys: Vec<&String> = value["error"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["code", "message"]);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
