//! HTTP surface: the MCP streamable-HTTP transport nested alongside a
//! progress SSE endpoint, a Prometheus scrape endpoint, and a health
//! check — mirroring this codebase's `web::create_router` composition
//! (CORS + trace layer wrapping a nested service router).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::stream::Stream;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use retrieval_engine::auth_gate::AuthContext;
use retrieval_engine::metrics_sink;
use retrieval_engine::Runtime;

use crate::progress_registry::ProgressRegistry;
use crate::server::RetrievalMcpServer;

#[derive(Clone)]
struct HttpState {
    runtime: Arc<Runtime>,
    progress: Arc<ProgressRegistry>,
}

/// Builds the axum router: `/mcp` (streamable HTTP transport), `/progress/{id}`
/// (SSE), `/metrics` (Prometheus scrape), `/healthz`.
pub fn build_router(runtime: Arc<Runtime>, progress: Arc<ProgressRegistry>) -> Router {
    let state = HttpState { runtime: Arc::clone(&runtime), progress: Arc::clone(&progress) };

    let mcp_service = create_mcp_service(Arc::clone(&runtime), Arc::clone(&progress));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    // /mcp and /progress carry request-bearing traffic and go through the
    // auth gate; /healthz and /metrics stay open for scrapers/probes.
    let guarded = Router::new()
        .route("/progress/{request_id}", get(progress_sse))
        .nest_service("/mcp", mcp_service)
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(guarded)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn create_mcp_service(
    runtime: Arc<Runtime>,
    progress: Arc<ProgressRegistry>,
) -> StreamableHttpService<RetrievalMcpServer, LocalSessionManager> {
    let service_factory = move || Ok(RetrievalMcpServer::new(Arc::clone(&runtime), Arc::clone(&progress)));
    let session_manager = Arc::new(LocalSessionManager::default());
    let config = StreamableHttpServerConfig {
        sse_keep_alive: Some(Duration::from_secs(15)),
        stateful_mode: true,
        cancellation_token: CancellationToken::new(),
    };
    StreamableHttpService::new(service_factory, session_manager, config)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics() -> impl IntoResponse {
    match metrics_sink::render() {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed".to_string()),
    }
}

/// Subscribes to the progress stream registered under `request_id` by a
/// concurrent `hybrid_search` call and relays its events as SSE. A
/// missing or already-finished request id yields an empty stream rather
/// than an error — the caller's tool call may simply have completed
/// before the subscriber connected.
async fn progress_sse(
    State(state): State<HttpState>,
    Path(request_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.progress.subscribe(&request_id).await;

    let events = async_stream::stream! {
        let Some(receiver) = receiver else { return };
        let mut rx = BroadcastStream::new(receiver);
        while let Some(item) = rx.next().await {
            if let Ok(event) = item
                && let Ok(json) = serde_json::to_string(&event)
            {
                yield Ok(Event::default().data(json));
            }
            // a Lagged error just means this subscriber missed some events;
            // the next successful recv carries on from where the broadcast is.
        }
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Extracts an [`AuthContext`] from a request's peer address and
/// headers, checking Authorization header, then `token` query
/// parameter, then `mcp_auth_token` cookie, in that precedence.
pub fn auth_context_from_request(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> AuthContext {
    let bearer_token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| query_token.map(str::to_string))
        .or_else(|| {
            headers
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|kv| {
                        let (k, v) = kv.trim().split_once('=')?;
                        (k == "mcp_auth_token").then(|| v.to_string())
                    })
                })
        });

    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    AuthContext { peer_addr: peer.ip(), forwarded_for, bearer_token }
}

/// Rejects requests the [`retrieval_engine::auth_gate::AuthGate`] denies
/// before they reach `/mcp`. Installed as an axum middleware over the
/// whole router in [`crate::main`].
pub async fn auth_middleware(
    State(state): State<HttpState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let query_token = request.uri().query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes()).find(|(k, _)| k == "token").map(|(_, v)| v.into_owned())
    });
    let ctx = auth_context_from_request(ConnectInfo(peer), request.headers(), query_token.as_deref());

    match state.runtime.auth_gate.check(&ctx) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(error = %e, ip = %peer.ip(), "rejected request at auth gate");
            (StatusCode::UNAUTHORIZED, e.to_user_string()).into_response()
        }
    }
}
