//! MCP tool implementations.
//!
//! Worker tools deliver events to the registration's workers; cache tools
//! inspect and clear the underlying stores directly.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

use crate::error::ToolError;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
