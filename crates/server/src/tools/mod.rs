//! MCP tool implementations.
//!
//! This module contains all tools exposed by the franchise resolver server.

pub mod cache;
pub mod listing;
pub mod lookup;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use franchise_core::Error;
use serde::Serialize;

pub use cache::{clear_impl, status_impl};
pub use listing::{agency_list_impl, franchise_list_impl};
pub use lookup::{FranchiseLookupParams, lookup_impl};

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
