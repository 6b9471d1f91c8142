//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP wire surface for exposing market-data
//! operations as tools to AI assistants. The server communicates over
//! stdio transport using line-delimited JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        MCP Server                          │
//! │                                                            │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│ Dispatcher  │───▶│   Invoker   │    │
//! │   │   (stdio)   │    │  (routing)  │    │   (tools)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │           │
//! │          ▼                  ▼                  ▼           │
//! │   ┌────────────────────────────────────────────────┐       │
//! │   │             JSON-RPC Messages                  │       │
//! │   └────────────────────────────────────────────────┘       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Method Surface
//!
//! `initialize`, `tools/list`, `tools/call` — plus the legacy aliases
//! `mcp:list-tools` and `mcp:call-tool`, kept routable for older client
//! integrations.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{Dispatcher, McpServer};
pub use transport::StdioTransport;
