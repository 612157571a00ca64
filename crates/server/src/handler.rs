//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the cache engine.
use std::sync::Arc;

use crate::tools::cache::{CacheFetchParams, CacheGetParams, fetch_impl, get_impl, status_impl};

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
use stalecache_client::{FetchClient, PolicyEngine};
use stalecache_core::CacheDb;

/// The engine as deployed: SQLite generations, reqwest network.
pub type Engine = PolicyEngine<CacheDb, FetchClient>;

/// The main MCP server handler for stalecache.
#[derive(Clone)]
pub struct CacheServer {
    engine: Arc<Engine>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CacheServer {
    /// Create a new server handler around a started engine.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the cache policy engine.
    #[tool(
        description = "Fetch a URL through the offline cache. GET requests to non-excluded hosts are served from \
                       cache when possible and refreshed in the background; everything else goes to the network."
    )]
    async fn cache_fetch(&self, params: Parameters<CacheFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.engine.as_ref(), params.0).await
    }

    /// Read an entry from the current generation.
    #[tool(description = "Read a stored response from the current cache generation without using the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.engine.as_ref(), params.0).await
    }

    /// Report lifecycle state and stored generations.
    #[tool(description = "Show the engine lifecycle state, cache generations and the URLs stored in the current one.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(self.engine.as_ref()).await
    }
}

impl ServerHandler for CacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "stalecache".into(),
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
