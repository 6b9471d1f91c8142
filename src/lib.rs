//! finance-data-mcp: MCP server exposing market-data tools to AI assistants
//!
//! This library implements a line-delimited JSON-RPC tool-dispatch server.
//! AI-assistant clients connect over stdio, discover a fixed catalog of
//! tools, and invoke them by name. Tool bodies are thin calls into an
//! external market-data provider; the server's job is routing, argument
//! validation, and normalising provider output into wire content.
//!
//! # Architecture
//!
//! - **Registry** ([`tools`]) — static ordered catalog of tool descriptors
//! - **Invoker** ([`tools::invoker`]) — name + arguments → provider call →
//!   normalised text content
//! - **Dispatcher** ([`mcp::server`]) — one line in, one line out
//! - **Transport** ([`mcp::transport`]) — newline-framed stdio
//! - **Provider** ([`provider`]) — the external capability interface
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation
//! - [`provider`] — Market-data capability provider
//! - [`tools`] — Tool registry and invoker

pub mod config;
pub mod error;
pub mod mcp;
pub mod provider;
pub mod tools;
