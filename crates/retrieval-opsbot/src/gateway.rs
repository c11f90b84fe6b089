//! Persistent socket client for the ops-bot gateway. Connects, reads
//! one `InboundEvent` per text frame, and reconnects with exponential
//! backoff on drop — the same `connect_async`/split/read-loop shape
//! this corpus's remote WebSocket backend uses for its own persistent
//! connection to a server.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use retrieval_engine::retry::RetryPolicy;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};

use crate::config::OpsBotConfig;
use crate::events::InboundEvent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs forever, calling `on_event` for each inbound event and
/// reconnecting (with backoff) whenever the socket drops. Only returns
/// if the connection cannot be reestablished after
/// `config.reconnect_max_attempts` consecutive failures.
pub async fn run<F, Fut>(config: &OpsBotConfig, mut on_event: F) -> Result<()>
where
    F: FnMut(InboundEvent) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let backoff = RetryPolicy { max_attempts: config.reconnect_max_attempts, ..RetryPolicy::default() };
    let mut attempt = 0u32;

    loop {
        match connect_once(config, &mut on_event).await {
            Ok(()) => {
                info!("gateway connection closed cleanly, reconnecting");
                attempt = 0;
            }
            Err(e) => {
                warn!(error = %e, attempt, "gateway connection failed");
                attempt += 1;
                if attempt >= backoff.max_attempts {
                    anyhow::bail!("gateway connection failed after {attempt} attempts: {e}");
                }
            }
        }
        tokio::time::sleep(backoff.delay_for_attempt(attempt)).await;
    }
}

async fn connect_once<F, Fut>(config: &OpsBotConfig, on_event: &mut F) -> Result<()>
where
    F: FnMut(InboundEvent) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let (ws, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&config.gateway_url))
        .await
        .context("gateway connect timed out")?
        .context("gateway connect failed")?;
    info!(url = %config.gateway_url, "connected to ops-bot gateway");

    let (_write, mut read) = ws.split();

    while let Some(frame) = read.next().await {
        let msg = frame.context("gateway read error")?;
        if !msg.is_text() {
            continue;
        }
        let text = match msg.to_text() {
            Ok(t) => t,
            Err(_) => continue,
        };
        match serde_json::from_str::<InboundEvent>(text) {
            Ok(event) => on_event(event).await,
            Err(e) => debug!(error = %e, "ignoring unparseable gateway frame"),
        }
    }

    Ok(())
}
