//! `retrieval-opsbot`: answers direct mentions and DMs delivered over a
//! persistent gateway socket, replying in the thread rooted at the
//! triggering message. The current channel's name becomes the default
//! chat-search channel filter, so a question asked in `#incidents` also
//! mines that channel's own history.

mod config;
mod events;
mod gateway;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use config::OpsBotConfig;
use events::InboundEvent;
use retrieval_engine::adapters::{ChatPlatformClient, HttpChatPlatformClient};
use retrieval_engine::circuit_breaker::CircuitBreaker;
use retrieval_engine::rate_limiter::RateLimiter;
use retrieval_engine::{AppConfig, ProgressStream, Runtime};
use retrieval_types::Query;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let opsbot_config = OpsBotConfig::from_env();
    let app_config = AppConfig::from_env();

    // A dedicated client for posting replies, independent of the
    // orchestrator's own chat-platform client — the orchestrator only
    // ever reads from the chat corpus, it has no reason to know how to
    // post into it.
    let poster: Arc<dyn ChatPlatformClient> = Arc::new(HttpChatPlatformClient::new(
        app_config.chat_platform.client_config(),
        Arc::new(RateLimiter::new(app_config.rate_limit.rate_limiter_config())),
        Arc::new(CircuitBreaker::new(app_config.circuit_breaker.breaker_config())),
    ));

    let runtime = Arc::new(retrieval_engine::build(app_config)?);

    info!(url = %opsbot_config.gateway_url, "starting ops-bot");

    gateway::run(&opsbot_config, move |event: InboundEvent| {
        let runtime = Arc::clone(&runtime);
        let poster = Arc::clone(&poster);
        let opsbot_config = opsbot_config.clone();
        async move {
            handle_event(runtime, poster, &opsbot_config, event).await;
        }
    })
    .await
}

async fn handle_event(
    runtime: Arc<Runtime>,
    poster: Arc<dyn ChatPlatformClient>,
    config: &OpsBotConfig,
    event: InboundEvent,
) {
    let text = event.query_text(&config.bot_user_id);
    if text.is_empty() {
        return;
    }

    let query = match Query::builder(text)
        .top_k(config.top_k)
        .chat_search(true, vec![event.channel_name.clone()])
        .build()
    {
        Ok(q) => q,
        Err(e) => {
            warn!(error = %e.to_user_string(), "ignoring invalid query from gateway event");
            return;
        }
    };

    let progress = ProgressStream::new();
    let answer = match runtime.orchestrator.handle(&query, &progress).await {
        Ok(response) => response.answer,
        Err(e) => {
            error!(error = %e, "orchestrator failed to answer gateway event");
            e.to_user_string()
        }
    };

    if let Err(e) = poster.post_reply(&event.channel_id, Some(event.reply_thread_ts()), &answer).await {
        error!(error = %e, channel = %event.channel_id, "failed to post reply");
    }
}
