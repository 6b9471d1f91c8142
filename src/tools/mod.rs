//! Tool registry and invoker.
//!
//! The registry is the static catalog advertised through `tools/list`;
//! the invoker executes `tools/call` requests against the capability
//! provider and normalises whatever comes back.

pub mod expr;
pub mod invoker;
mod registry;

pub use invoker::{ToolCallResult, ToolContent, ToolError, ToolInvoker};
pub use registry::{tool_definitions, ToolDefinition};
