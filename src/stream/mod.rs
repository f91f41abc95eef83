//! Incremental stream parsing and tool-call extraction.

pub mod extract;
pub mod parser;

pub use extract::{first_tool_call, ToolCall, ToolCallOutcome};
pub use parser::StreamParser;
