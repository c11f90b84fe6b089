use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use retrieval_types::RetrievalError;

use crate::circuit_breaker::CircuitBreaker;
use crate::retry::RetryPolicy;

const CIRCUIT_KEY: &str = "chat_completion";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatMessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatMessageRole::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatMessageRole::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatMessageRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, RetrievalError>;
}

pub struct HttpChatCompletionClient {
    http: reqwest::Client,
    config: ChatCompletionConfig,
    circuit_breaker: Arc<CircuitBreaker<&'static str>>,
    retry: RetryPolicy,
}

impl HttpChatCompletionClient {
    pub fn new(config: ChatCompletionConfig, circuit_breaker: Arc<CircuitBreaker<&'static str>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            circuit_breaker,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    block_type: String,
    text: String,
}

#[async_trait]
impl ChatCompletionClient for HttpChatCompletionClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, RetrievalError> {
        if !self.circuit_breaker.is_available(&CIRCUIT_KEY) {
            return Err(RetrievalError::CircuitOpen { adapter: CIRCUIT_KEY });
        }

        // The upstream API forbids a `system` role inside the turn list;
        // every system message is joined and sent as a separate field.
        let system: Vec<&str> = turns
            .iter()
            .filter(|t| t.role == ChatMessageRole::System)
            .map(|t| t.content.as_str())
            .collect();
        let system = if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        };

        let messages: Vec<ApiMessage> = turns
            .iter()
            .filter(|t| t.role != ChatMessageRole::System)
            .map(|t| ApiMessage {
                role: match t.role {
                    ChatMessageRole::User => "user",
                    ChatMessageRole::Assistant => "assistant",
                    ChatMessageRole::System => unreachable!(),
                },
                content: &t.content,
            })
            .collect();

        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            system,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
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
                        "chat completion returned {}",
                        response.status()
                    )));
                }

                let parsed: CompletionResponse = response.json().await?;
                Ok(parsed
                    .content
                    .into_iter()
                    .map(|b| b.text)
                    .collect::<Vec<_>>()
                    .join(""))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_turns_are_excluded_from_the_turn_list() {
        let turns = vec![
            ChatTurn::system("be concise"),
            ChatTurn::user("hello"),
            ChatTurn::assistant("hi"),
        ];
        let system: Vec<&str> = turns
            .iter()
            .filter(|t| t.role == ChatMessageRole::System)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(system, vec!["be concise"]);
        let remaining: Vec<&ChatTurn> = turns.iter().filter(|t| t.role != ChatMessageRole::System).collect();
        assert_eq!(remaining.len(), 2);
    }
}
