//! `retrieval-cli`: a line-oriented chat REPL over the hybrid
//! retrieval orchestrator. Reserved commands `exit`/`quit`,
//! `help`, `clear`; everything else becomes a search query with
//! `top_k` drawn from `--top-k`.

mod repl;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use repl::Repl;
use retrieval_engine::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "retrieval-cli", about = "Hybrid retrieval chat REPL")]
struct Cli {
    /// Number of document results to request per query.
    #[arg(long, default_value_t = 10)]
    top_k: usize,

    /// Also mine the chat corpus via the iterative refinement pipeline.
    #[arg(long)]
    chat_search: bool,

    /// Restrict chat search to these channel names (repeatable).
    #[arg(long = "channel")]
    chat_channels: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = AppConfig::from_env();
    let runtime = Arc::new(retrieval_engine::build(config)?);

    let mut repl = Repl::new(runtime, cli.top_k, cli.chat_search, cli.chat_channels)?;
    repl.run().await
}
