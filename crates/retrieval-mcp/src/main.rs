//! `retrieval-mcp`: exposes the hybrid_search tool over either MCP
//! stdio framing (the default, for use as a subprocess tool server) or
//! streamable HTTP (for a long-lived network deployment).

mod http;
mod params;
mod progress_registry;
mod query_builder;
mod response_builder;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use progress_registry::ProgressRegistry;
use retrieval_engine::{metrics_sink, AppConfig, Runtime};
use server::RetrievalMcpServer;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "retrieval-mcp", about = "Hybrid retrieval MCP tool server")]
struct Cli {
    /// Transport to serve the MCP protocol over.
    #[arg(long, value_enum, default_value = "stdio")]
    transport: Transport,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Quiet for stdio framing, full logging when serving over HTTP.
    let default_level = match cli.transport {
        Transport::Stdio => "warn",
        Transport::Http => "info",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = AppConfig::from_env();
    let runtime = Arc::new(retrieval_engine::build(config)?);
    let progress = Arc::new(ProgressRegistry::new());

    match cli.transport {
        Transport::Stdio => run_stdio(runtime, progress).await,
        Transport::Http => run_http(runtime, progress).await,
    }
}

async fn run_stdio(runtime: Arc<Runtime>, progress: Arc<ProgressRegistry>) -> Result<()> {
    let server = RetrievalMcpServer::new(runtime, progress);
    let transport = rmcp::transport::io::stdio();
    let service = rmcp::serve_server(server, transport).await?;
    service.waiting().await?;
    Ok(())
}

async fn run_http(runtime: Arc<Runtime>, progress: Arc<ProgressRegistry>) -> Result<()> {
    metrics_sink::init_metrics();

    let bind_address = runtime.config.server.bind_address();
    let app = http::build_router(runtime, progress);

    let addr: SocketAddr = bind_address.parse()?;
    info!(%addr, "retrieval-mcp listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
