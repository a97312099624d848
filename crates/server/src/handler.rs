//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker registration.
use crate::tools::{
    cache::{CacheClearParams, CacheListParams, clear_impl, list_impl},
    events::{
        WorkerNotificationClickParams, WorkerPushParams, WorkerSyncParams, notification_click_impl, push_impl,
        sync_impl,
    },
    fetch::{WorkerFetchParams, fetch_impl},
    lifecycle::{WorkerInstallParams, activate_impl, install_impl},
};

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
use std::sync::Arc;
use swcache_client::{Registration, WorkerSettings};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwcacheServer {
    tool_router: ToolRouter<Self>,
    registration: Arc<Registration>,
    settings: WorkerSettings,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwcacheServer {
    /// Create a new server handler around a worker registration.
    pub fn new(registration: Arc<Registration>, settings: WorkerSettings) -> Self {
        Self { tool_router: Self::tool_router(), registration, settings }
    }

    #[tool(
        description = "Install a new worker: precache the manifest into a new cache generation. Fails atomically if any entry cannot be fetched."
    )]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.registration, &self.settings, params.0).await
    }

    #[tool(description = "Activate the installed worker: delete stale cache generations and claim open clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.registration).await
    }

    /// Fetch a URL through the active worker.
    ///
    /// Reports whether the response came from the cache, the network, the
    /// offline fallback, or the synthetic offline response.
    #[tool(
        description = "Fetch a URL through the active worker (cache-first, offline fallback). Returns status, source and body."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, params.0).await
    }

    #[tool(description = "Deliver a push message to the active worker, which shows a notification.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.registration, params.0).await
    }

    #[tool(description = "Click a shown notification: focuses the app window or opens a new one.")]
    async fn worker_notification_click(
        &self, params: Parameters<WorkerNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.registration, params.0).await
    }

    #[tool(description = "Deliver a background sync event with the given tag.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.registration, params.0).await
    }

    #[tool(description = "List cache stores with entry counts, oldest first.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.registration, params.0).await
    }

    #[tool(description = "Delete one cache store, or every store when no name is given.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.registration, params.0).await
    }
}

impl ServerHandler for SwcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache-mcp".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{registration, settings};

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let (registration, _db) = registration().await;
        let server = SwcacheServer::new(registration, settings());

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_clear",
                "cache_list",
                "worker_activate",
                "worker_fetch",
                "worker_install",
                "worker_notification_click",
                "worker_push",
                "worker_sync",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (registration, _db) = registration().await;
        let info = SwcacheServer::new(registration, settings()).get_info();
        assert_eq!(info.server_info.name, "swcache-mcp");
    }
}
