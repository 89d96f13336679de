//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    FranchiseLookupParams, agency_list_impl, clear_impl, franchise_list_impl, lookup_impl, status_impl,
};
use franchise_client::TokenSource;
use franchise_core::{FranchiseResolver, RefreshScheduler};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for the franchise resolver.
#[derive(Clone)]
pub struct FranchiseServer {
    resolver: FranchiseResolver,
    scheduler: Arc<RefreshScheduler>,
    tokens: Arc<dyn TokenSource>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl FranchiseServer {
    /// Create a new server handler over a resolver, its refresh scheduler and
    /// the token source the directory client authenticates with.
    pub fn new(resolver: FranchiseResolver, scheduler: Arc<RefreshScheduler>, tokens: Arc<dyn TokenSource>) -> Self {
        Self { resolver, scheduler, tokens, tool_router: Self::tool_router() }
    }

    /// Resolve a franchise number to its agency.
    #[tool(
        description = "Resolve a franchise number to the agency that owns it. Manual overrides win over the derived index."
    )]
    async fn franchise_lookup(&self, params: Parameters<FranchiseLookupParams>) -> Result<CallToolResult, McpError> {
        lookup_impl(&self.resolver, params.0).await
    }

    /// List every franchise number in the derived index.
    #[tool(description = "List every franchise number with its agency id. Manual overrides are not listed.")]
    async fn franchise_list(&self) -> Result<CallToolResult, McpError> {
        franchise_list_impl(&self.resolver)
    }

    /// List every agency in the derived index.
    #[tool(description = "List agencies in ascending id order with the franchise numbers found for each.")]
    async fn agency_list(&self) -> Result<CallToolResult, McpError> {
        agency_list_impl(&self.resolver)
    }

    /// Drop the cached index, TTL, overrides and bearer token.
    #[tool(
        description = "Clear the franchise cache and the directory bearer token. Overrides, TTL and credentials are re-read on next use; the index returns with the next scheduled refresh."
    )]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.resolver, self.tokens.as_ref()).await
    }

    /// Report cache contents and refresh scheduler state.
    #[tool(description = "Report cached agency and franchise counts, index expiry, and refresh scheduler state.")]
    async fn status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.resolver, &self.scheduler)
    }
}

impl ServerHandler for FranchiseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "franchise-resolver".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
