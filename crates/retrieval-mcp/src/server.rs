//! The `hybrid_search` MCP tool and its `ServerHandler` plumbing.

use std::sync::Arc;

use retrieval_engine::{ProgressStream, Runtime};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router, ErrorData, ServerHandler};
use tracing::{error, warn};

use crate::params::HybridSearchParams;
use crate::progress_registry::ProgressRegistry;
use crate::query_builder::build_query;
use crate::response_builder::build_response;

#[derive(Clone)]
pub struct RetrievalMcpServer {
    runtime: Arc<Runtime>,
    progress: Arc<ProgressRegistry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl RetrievalMcpServer {
    pub fn new(runtime: Arc<Runtime>, progress: Arc<ProgressRegistry>) -> Self {
        Self { runtime, progress, tool_router: Self::tool_router() }
    }

    pub fn progress_registry(&self) -> Arc<ProgressRegistry> {
        Arc::clone(&self.progress)
    }

    #[tool(
        description = "Hybrid BM25 + dense-vector search over the indexed document corpus, with an optional \
iterative chat-history refinement pass. Returns structured results, not a generated answer."
    )]
    async fn hybrid_search(
        &self,
        Parameters(params): Parameters<HybridSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request_id = params.request_id.clone();

        let query = match build_query(params) {
            Ok(q) => q,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_user_string())])),
        };

        let stream = match &request_id {
            Some(id) => self.progress.register(id.clone()).await,
            None => Arc::new(ProgressStream::new()),
        };

        let outcome = self.runtime.orchestrator.retrieve(&query, &stream).await;

        if let Some(id) = &request_id {
            self.progress.remove(id).await;
        }

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "hybrid_search tool call failed");
                return Ok(CallToolResult::error(vec![Content::text(e.to_user_string())]));
            }
        };

        let response = build_response(&query, outcome);
        let body = match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to serialize hybrid_search response");
                return Ok(CallToolResult::error(vec![Content::text(
                    "internal error composing response".to_string(),
                )]));
            }
        };

        Ok(CallToolResult::success(vec![Content::text(body)]))
    }
}

impl ServerHandler for RetrievalMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "retrieval-mcp".into(),
                title: Some("Hybrid Retrieval Engine".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Exposes hybrid_search: BM25 + dense-vector document search fused with an iterative \
chat-history refinement pass over the indexed corpus."
                    .into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(rmcp::model::ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        }))
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        let context = rmcp::handler::server::tool::ToolCallContext::new(self, request, context);
        self.tool_router.call(context)
    }
}
