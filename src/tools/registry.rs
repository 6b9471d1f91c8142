//! The tool catalog advertised to clients.
//!
//! Built once at server construction and never mutated. Order is
//! significant only for display and debugging, but it is stable for the
//! life of the process and tests pin specific indices.

use serde::Serialize;
use serde_json::{json, Value};

/// A tool definition for the tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Returns the list of available tools.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "echo".to_string(),
            description: "Echo back the input text".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to echo back"
                    }
                },
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: "calculate".to_string(),
            description: "Perform basic arithmetic calculations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Mathematical expression to evaluate"
                    }
                },
                "required": ["expression"]
            }),
        },
        ToolDefinition {
            name: "get_time".to_string(),
            description: "Get current time information".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "get_stock_spot".to_string(),
            description: "Get the latest quote for an A-share stock".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Stock symbol (e.g. 000001)"
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_stock_history".to_string(),
            description: "Get historical stock data".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Stock symbol (e.g. 000001)"
                    },
                    "period": {
                        "type": "string",
                        "description": "Data period: daily, weekly, or monthly",
                        "enum": ["daily", "weekly", "monthly"]
                    }
                },
                "required": ["symbol"]
            }),
        },
        ToolDefinition {
            name: "get_fund_info".to_string(),
            description: "Get open-fund information".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Fund code"
                    }
                },
                "required": ["symbol"]
            }),
        },
        ToolDefinition {
            name: "get_index_data".to_string(),
            description: "Get stock index data".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Index code (e.g. 000001); omit for the major indices"
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_futures_data".to_string(),
            description: "Get futures market data".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Futures contract code; omit for the main contracts"
                    }
                },
                "required": []
            }),
        },
    ]
}
