use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use retrieval_types::RetrievalError;

use crate::circuit_breaker::CircuitBreaker;
use crate::retry::RetryPolicy;

pub const EMBEDDING_DIMENSIONS: usize = 1024;
const CIRCUIT_KEY: &str = "embedding";

#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// One process-wide HTTP client per (endpoint, model) pair — every
/// caller embedding against the same model shares this connection pool.
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingClientConfig,
    circuit_breaker: Arc<CircuitBreaker<&'static str>>,
    retry: RetryPolicy,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig, circuit_breaker: Arc<CircuitBreaker<&'static str>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            circuit_breaker,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    #[serde(rename = "inputText")]
    input_text: &'a str,
    dimensions: usize,
    normalize: bool,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
    #[allow(dead_code)]
    #[serde(rename = "inputTextTokenCount")]
    input_text_token_count: Option<u32>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        if text.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("embedding input is empty".into()));
        }
        if !self.circuit_breaker.is_available(&CIRCUIT_KEY) {
            return Err(RetrievalError::CircuitOpen { adapter: CIRCUIT_KEY });
        }

        let request = EmbedRequest {
            input_text: text,
            dimensions: EMBEDDING_DIMENSIONS,
            normalize: true,
            model: &self.config.model,
        };

        let result = self
            .retry
            .run(|| async {
                let response = self
                    .http
                    .post(&self.config.endpoint)
                    .bearer_auth(&self.config.api_key)
                    .timeout(self.config.timeout)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            RetrievalError::Timeout(self.config.timeout)
                        } else {
                            RetrievalError::UpstreamUnavailable(e.to_string())
                        }
                    })?;

                if response.status().is_server_error() || response.status().as_u16() == 429 {
                    return Err(RetrievalError::UpstreamUnavailable(format!(
                        "embedding service returned {}",
                        response.status()
                    )));
                }

                let parsed: EmbedResponse = response.json().await?;
                Ok(parsed.embedding)
            })
            .await;

        match &result {
            Ok(_) => self.circuit_breaker.record_success(&CIRCUIT_KEY),
            Err(e) if e.is_retryable() => {
                self.circuit_breaker.record_failure(&CIRCUIT_KEY);
            }
            Err(_) => {}
        }
        result
    }
}
