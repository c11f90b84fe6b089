//! Wires one [`AppConfig`] into a ready-to-use runtime: every adapter,
//! the fusion engine, the refinement pipeline, the orchestrator and the
//! auth gate. Each of the three surface binaries calls [`build`] once at
//! startup instead of repeating this assembly.

use std::sync::Arc;

use retrieval_types::RetrievalError;

use crate::adapters::{
    ChatCompletionClient, ChatPlatformClient, EmbeddingClient, HttpChatCompletionClient,
    HttpChatPlatformClient, HttpEmbeddingClient, HttpIndexClient, IndexClient,
};
use crate::auth_gate::AuthGate;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::AppConfig;
use crate::fusion::HybridSearchEngine;
use crate::orchestrator::HybridSearchOrchestrator;
use crate::pipeline::{LlmQueryPlanner, SlackRetrievalPipeline};
use crate::rate_limiter::RateLimiter;

pub struct Runtime {
    pub config: AppConfig,
    pub orchestrator: Arc<HybridSearchOrchestrator>,
    pub auth_gate: Arc<AuthGate>,
}

/// Builds every adapter and domain object from `config`. Adapters share
/// one rate limiter and one circuit breaker per adapter kind, matching
/// the process-wide instances each HTTP adapter expects.
pub fn build(config: AppConfig) -> Result<Runtime, RetrievalError> {
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.rate_limiter_config()));
    let breaker_config = config.circuit_breaker.breaker_config();

    let index_client: Arc<dyn IndexClient> = Arc::new(HttpIndexClient::new(
        config.index.client_config(),
        Arc::clone(&rate_limiter),
        Arc::new(CircuitBreaker::new(breaker_config)),
    ));

    let embedding_client: Arc<dyn EmbeddingClient> = Arc::new(HttpEmbeddingClient::new(
        config.embedding.client_config(),
        Arc::new(CircuitBreaker::new(breaker_config)),
    ));

    let chat_completion: Arc<dyn ChatCompletionClient> = Arc::new(HttpChatCompletionClient::new(
        config.chat_completion.client_config(),
        Arc::new(CircuitBreaker::new(breaker_config)),
    ));

    let chat_platform: Arc<dyn ChatPlatformClient> = Arc::new(HttpChatPlatformClient::new(
        config.chat_platform.client_config(),
        Arc::clone(&rate_limiter),
        Arc::new(CircuitBreaker::new(breaker_config)),
    ));

    let engine = Arc::new(HybridSearchEngine::new(Arc::clone(&index_client), Arc::clone(&embedding_client)));

    let planner = LlmQueryPlanner::new(Arc::clone(&chat_completion));
    let pipeline = Arc::new(SlackRetrievalPipeline::new(
        planner,
        Arc::clone(&chat_platform),
        config.pipeline.pipeline_config(),
    ));

    let orchestrator = Arc::new(HybridSearchOrchestrator::new(
        engine,
        pipeline,
        chat_completion,
        config.index.default_index.clone(),
    ));

    let auth_gate = Arc::new(AuthGate::new(config.auth.clone(), None));

    Ok(Runtime { config, orchestrator, auth_gate })
}
