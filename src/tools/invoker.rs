//! Tool invocation and result normalisation.
//!
//! The invoker owns the one boundary where provider heterogeneity is
//! absorbed: whatever shape a provider returns, clients only ever see
//! `{type: "text", text}` content blocks. Dispatch failures (unknown
//! tool, missing required argument) surface as [`ToolError`] for the
//! dispatcher to map onto the wire; provider failures are recovered
//! locally into displayable content and are never protocol errors.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::provider::{MarketDataProvider, Period, ProviderContent, ProviderResult};

use super::expr;

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a single-block text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

/// Dispatch-level tool failures. These become protocol errors; anything
/// the provider raises stays a successful, self-describing result.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool name is not in the registry.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument is absent.
    #[error("Missing '{0}' argument")]
    MissingArgument(&'static str),
}

/// Executes named tools against supplied arguments.
pub struct ToolInvoker {
    provider: Arc<dyn MarketDataProvider>,
}

impl ToolInvoker {
    /// Creates an invoker backed by the given capability provider.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Invokes the tool `name` with `arguments`.
    ///
    /// Names are case-sensitive exact matches against the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for unknown tools and missing required
    /// arguments. Provider failures do not error; they are recovered
    /// into a successful result whose text narrates the failure.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ToolCallResult, ToolError> {
        match name {
            "echo" => Self::call_echo(arguments),
            "calculate" => Self::call_calculate(arguments),
            "get_time" => Ok(Self::call_get_time()),
            "get_stock_spot" => {
                let symbol = optional_str(arguments, "symbol");
                Ok(self.recovered(name, self.provider.stock_spot(symbol)).await)
            }
            "get_stock_history" => {
                let symbol = required_str(arguments, "symbol")?;
                let period_raw = arguments
                    .get("period")
                    .and_then(Value::as_str)
                    .unwrap_or("daily");
                let Some(period) = Period::parse(period_raw) else {
                    return Ok(ToolCallResult::text(format!(
                        "Unsupported period '{period_raw}'; use daily, weekly, or monthly"
                    )));
                };
                Ok(self
                    .recovered(name, self.provider.stock_history(symbol, period))
                    .await)
            }
            "get_fund_info" => {
                let symbol = required_str(arguments, "symbol")?;
                Ok(self.recovered(name, self.provider.fund_info(symbol)).await)
            }
            "get_index_data" => {
                let symbol = optional_str(arguments, "symbol");
                Ok(self.recovered(name, self.provider.index_data(symbol)).await)
            }
            "get_futures_data" => {
                let symbol = optional_str(arguments, "symbol");
                Ok(self
                    .recovered(name, self.provider.futures_data(symbol))
                    .await)
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn call_echo(arguments: &Map<String, Value>) -> Result<ToolCallResult, ToolError> {
        match arguments.get("text") {
            None => Err(ToolError::MissingArgument("text")),
            Some(Value::String(s)) => Ok(ToolCallResult::text(s.clone())),
            Some(other) => Ok(ToolCallResult::text(other.to_string())),
        }
    }

    fn call_calculate(arguments: &Map<String, Value>) -> Result<ToolCallResult, ToolError> {
        let expression = match arguments.get("expression") {
            None => return Err(ToolError::MissingArgument("expression")),
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Ok(ToolCallResult::text(format!(
                    "Error: expression must be a string, got {other}"
                )));
            }
        };

        // Evaluation failures are the tool's own output, not dispatch
        // errors: the client still gets a displayable result.
        match expr::evaluate(expression) {
            Ok(value) => Ok(ToolCallResult::text(format!(
                "Result: {}",
                expr::format_value(value)
            ))),
            Err(e) => Ok(ToolCallResult::text(format!("Error: {e}"))),
        }
    }

    fn call_get_time() -> ToolCallResult {
        let now = chrono::Local::now();
        ToolCallResult::text(format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S")))
    }

    /// Awaits a provider call, normalising its content on success and
    /// recovering any provider error into failure text.
    async fn recovered<F>(&self, operation: &str, call: F) -> ToolCallResult
    where
        F: std::future::Future<Output = ProviderResult>,
    {
        match call.await {
            Ok(content) => ToolCallResult {
                content: content.into_iter().map(normalise_content).collect(),
            },
            Err(error) => {
                tracing::warn!(operation, error = %error, "provider call failed");
                ToolCallResult::text(format!("{operation} failed: {error}"))
            }
        }
    }
}

/// Normalises one provider content element to a wire content block.
fn normalise_content(content: ProviderContent) -> ToolContent {
    match content {
        ProviderContent::Text { text } => ToolContent::Text { text },
        ProviderContent::Value(value) => ToolContent::Text {
            text: coerce_to_text(&value),
        },
    }
}

/// Coerces an arbitrary provider value to text: a mapping carrying a
/// `"text"` key contributes that text directly, a bare string is used
/// as-is, and anything else becomes its JSON string representation.
fn coerce_to_text(value: &Value) -> String {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn optional_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or("")
}

fn required_str<'a>(
    arguments: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or(ToolError::MissingArgument(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, ProviderResult};
    use async_trait::async_trait;
    use serde_json::json;

    /// Provider that answers every call with the same content.
    struct FixedProvider(Vec<ProviderContent>);

    #[async_trait]
    impl MarketDataProvider for FixedProvider {
        async fn stock_spot(&self, _symbol: &str) -> ProviderResult {
            Ok(self.0.clone())
        }
        async fn stock_history(&self, _symbol: &str, _period: Period) -> ProviderResult {
            Ok(self.0.clone())
        }
        async fn fund_info(&self, _symbol: &str) -> ProviderResult {
            Ok(self.0.clone())
        }
        async fn index_data(&self, _symbol: &str) -> ProviderResult {
            Ok(self.0.clone())
        }
        async fn futures_data(&self, _symbol: &str) -> ProviderResult {
            Ok(self.0.clone())
        }
    }

    /// Provider that fails every call.
    struct FailingProvider;

    fn failure() -> ProviderResult {
        Err(ProviderError::Decode {
            url: "https://example.invalid/quote".to_string(),
            message: "connection reset by peer".to_string(),
        })
    }

    #[async_trait]
    impl MarketDataProvider for FailingProvider {
        async fn stock_spot(&self, _symbol: &str) -> ProviderResult {
            failure()
        }
        async fn stock_history(&self, _symbol: &str, _period: Period) -> ProviderResult {
            failure()
        }
        async fn fund_info(&self, _symbol: &str) -> ProviderResult {
            failure()
        }
        async fn index_data(&self, _symbol: &str) -> ProviderResult {
            failure()
        }
        async fn futures_data(&self, _symbol: &str) -> ProviderResult {
            failure()
        }
    }

    fn invoker(provider: impl MarketDataProvider + 'static) -> ToolInvoker {
        ToolInvoker::new(Arc::new(provider))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn first_text(result: &ToolCallResult) -> &str {
        let ToolContent::Text { text } = &result.content[0];
        text
    }

    #[tokio::test]
    async fn echo_round_trips_text() {
        let result = invoker(FixedProvider(vec![]))
            .call_tool("echo", &args(json!({"text": "Hello, World!"})))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);
        assert_eq!(first_text(&result), "Hello, World!");
    }

    #[tokio::test]
    async fn echo_missing_argument() {
        let err = invoker(FixedProvider(vec![]))
            .call_tool("echo", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing 'text' argument");
    }

    #[tokio::test]
    async fn echo_coerces_non_string_text() {
        let result = invoker(FixedProvider(vec![]))
            .call_tool("echo", &args(json!({"text": 42})))
            .await
            .unwrap();
        assert_eq!(first_text(&result), "42");
    }

    #[tokio::test]
    async fn calculate_respects_precedence() {
        let result = invoker(FixedProvider(vec![]))
            .call_tool("calculate", &args(json!({"expression": "2 + 3 * 4"})))
            .await
            .unwrap();
        assert_eq!(first_text(&result), "Result: 14");
    }

    #[tokio::test]
    async fn calculate_reports_evaluation_failure_as_content() {
        let result = invoker(FixedProvider(vec![]))
            .call_tool("calculate", &args(json!({"expression": "2 + "})))
            .await
            .unwrap();
        assert!(first_text(&result).starts_with("Error:"));
    }

    #[tokio::test]
    async fn calculate_missing_argument() {
        let err = invoker(FixedProvider(vec![]))
            .call_tool("calculate", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing 'expression' argument");
    }

    #[tokio::test]
    async fn get_time_with_no_arguments() {
        let result = invoker(FixedProvider(vec![]))
            .call_tool("get_time", &Map::new())
            .await
            .unwrap();
        assert!(first_text(&result).starts_with("Current time: "));
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = invoker(FixedProvider(vec![]))
            .call_tool("unknown_tool", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: unknown_tool");
    }

    #[tokio::test]
    async fn tool_names_are_case_sensitive() {
        let err = invoker(FixedProvider(vec![]))
            .call_tool("Echo", &args(json!({"text": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: Echo");
    }

    #[tokio::test]
    async fn history_requires_symbol() {
        let err = invoker(FixedProvider(vec![]))
            .call_tool("get_stock_history", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing 'symbol' argument");
    }

    #[tokio::test]
    async fn history_rejects_unknown_period_as_content() {
        let result = invoker(FixedProvider(vec![]))
            .call_tool(
                "get_stock_history",
                &args(json!({"symbol": "000001", "period": "hourly"})),
            )
            .await
            .unwrap();
        assert!(first_text(&result).contains("Unsupported period 'hourly'"));
    }

    #[tokio::test]
    async fn zero_argument_provider_tool_succeeds() {
        let provider = FixedProvider(vec![ProviderContent::text("index report")]);
        let result = invoker(provider)
            .call_tool("get_index_data", &Map::new())
            .await
            .unwrap();
        assert_eq!(first_text(&result), "index report");
    }

    #[tokio::test]
    async fn provider_failure_is_recovered_as_content() {
        let result = invoker(FailingProvider)
            .call_tool("get_stock_spot", &args(json!({"symbol": "000001"})))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);
        let text = first_text(&result);
        assert!(text.starts_with("get_stock_spot failed: "));
        assert!(text.contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn provider_content_is_normalised_to_text_blocks() {
        let provider = FixedProvider(vec![
            ProviderContent::text("already text"),
            ProviderContent::Value(json!({"text": "from mapping", "extra": 1})),
            ProviderContent::Value(json!({"price": 12.5})),
            ProviderContent::Value(json!("bare string")),
            ProviderContent::Value(json!(99)),
        ]);
        let result = invoker(provider)
            .call_tool("get_futures_data", &Map::new())
            .await
            .unwrap();

        let texts: Vec<&str> = result
            .content
            .iter()
            .map(|c| {
                let ToolContent::Text { text } = c;
                text.as_str()
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "already text",
                "from mapping",
                r#"{"price":12.5}"#,
                "bare string",
                "99",
            ]
        );
    }

    #[test]
    fn result_serialises_as_typed_content() {
        let result = ToolCallResult::text("hello");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "hello");
    }
}
