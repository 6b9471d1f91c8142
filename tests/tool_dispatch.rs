//! Integration tests for the tool registry and invoker.
//!
//! These exercise the public library API below the wire layer: catalog
//! stability, name resolution, argument validation, and result
//! normalisation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use finance_data_mcp::provider::{
    MarketDataProvider, Period, ProviderContent, ProviderResult,
};
use finance_data_mcp::tools::{tool_definitions, ToolContent, ToolInvoker};

/// Records the arguments it was called with and echoes them back as
/// content, so tests can assert what crossed the capability boundary.
struct EchoingProvider;

#[async_trait]
impl MarketDataProvider for EchoingProvider {
    async fn stock_spot(&self, symbol: &str) -> ProviderResult {
        Ok(vec![ProviderContent::text(format!("spot:{symbol}"))])
    }
    async fn stock_history(&self, symbol: &str, period: Period) -> ProviderResult {
        Ok(vec![ProviderContent::text(format!(
            "history:{symbol}:{}",
            period.as_str()
        ))])
    }
    async fn fund_info(&self, symbol: &str) -> ProviderResult {
        Ok(vec![ProviderContent::text(format!("fund:{symbol}"))])
    }
    async fn index_data(&self, symbol: &str) -> ProviderResult {
        Ok(vec![ProviderContent::text(format!("index:{symbol}"))])
    }
    async fn futures_data(&self, symbol: &str) -> ProviderResult {
        Ok(vec![ProviderContent::text(format!("futures:{symbol}"))])
    }
}

fn invoker() -> ToolInvoker {
    ToolInvoker::new(Arc::new(EchoingProvider))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn texts(content: &[ToolContent]) -> Vec<&str> {
    content
        .iter()
        .map(|c| {
            let ToolContent::Text { text } = c;
            text.as_str()
        })
        .collect()
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn registry_is_deterministic() {
    let first = tool_definitions();
    let second = tool_definitions();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.description, b.description);
        assert_eq!(a.input_schema, b.input_schema);
    }
}

#[test]
fn registry_matches_expected_catalog() {
    let names: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
    assert_eq!(
        names,
        vec![
            "echo",
            "calculate",
            "get_time",
            "get_stock_spot",
            "get_stock_history",
            "get_fund_info",
            "get_index_data",
            "get_futures_data",
        ]
    );
}

// =============================================================================
// Invoker behaviour
// =============================================================================

#[tokio::test]
async fn every_catalog_entry_resolves_to_a_handler() {
    let invoker = invoker();

    for tool in tool_definitions() {
        let arguments = match tool.name.as_str() {
            "echo" => args(json!({"text": "probe"})),
            "calculate" => args(json!({"expression": "3 * 3"})),
            _ => args(json!({"symbol": "600519"})),
        };

        let result = invoker
            .call_tool(&tool.name, &arguments)
            .await
            .unwrap_or_else(|e| panic!("{} should dispatch: {e}", tool.name));
        assert!(!result.content.is_empty());
    }
}

#[tokio::test]
async fn symbol_and_period_reach_the_provider() {
    let result = invoker()
        .call_tool(
            "get_stock_history",
            &args(json!({"symbol": "600519", "period": "weekly"})),
        )
        .await
        .unwrap();

    assert_eq!(texts(&result.content), vec!["history:600519:weekly"]);
}

#[tokio::test]
async fn period_defaults_to_daily() {
    let result = invoker()
        .call_tool("get_stock_history", &args(json!({"symbol": "600519"})))
        .await
        .unwrap();

    assert_eq!(texts(&result.content), vec!["history:600519:daily"]);
}

#[tokio::test]
async fn optional_symbol_defaults_to_empty() {
    let result = invoker()
        .call_tool("get_index_data", &Map::new())
        .await
        .unwrap();

    assert_eq!(texts(&result.content), vec!["index:"]);
}

#[tokio::test]
async fn calculate_formats_integral_results_plainly() {
    let invoker = invoker();

    let cases = [
        ("2 + 3 * 4", "Result: 14"),
        ("(2 + 3) * 4", "Result: 20"),
        ("10 / 4", "Result: 2.5"),
        ("-3 + 5", "Result: 2"),
    ];
    for (expression, expected) in cases {
        let result = invoker
            .call_tool("calculate", &args(json!({"expression": expression})))
            .await
            .unwrap();
        assert_eq!(texts(&result.content), vec![expected], "for {expression}");
    }
}

#[tokio::test]
async fn calculate_division_by_zero_is_reported_as_content() {
    let result = invoker()
        .call_tool("calculate", &args(json!({"expression": "1 / 0"})))
        .await
        .unwrap();

    let text = texts(&result.content)[0];
    assert!(text.starts_with("Error:"));
    assert!(text.contains("division by zero"));
}

#[tokio::test]
async fn missing_required_arguments_per_tool() {
    let invoker = invoker();

    for (tool, argument) in [
        ("echo", "text"),
        ("calculate", "expression"),
        ("get_stock_history", "symbol"),
        ("get_fund_info", "symbol"),
    ] {
        let err = invoker.call_tool(tool, &Map::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Missing '{argument}' argument"),
            "for {tool}"
        );
    }
}

#[tokio::test]
async fn unknown_names_are_exact_match_failures() {
    let invoker = invoker();

    for name in ["", "ECHO", "echo ", "get_stock", "get_stock_spot_v2"] {
        let err = invoker.call_tool(name, &Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Unknown tool: {name}"));
    }
}
