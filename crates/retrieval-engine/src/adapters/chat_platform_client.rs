use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use retrieval_types::{ChatMessage, RetrievalError};

use crate::circuit_breaker::CircuitBreaker;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;

const CIRCUIT_KEY: &str = "chat_platform";

#[derive(Debug, Clone)]
pub struct ChatPlatformConfig {
    pub endpoint: String,
    pub bot_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSearchResponse {
    pub messages: Vec<ChatMessage>,
}

/// The chat platform surfaces the pipeline searches and enriches
/// messages against: message search, channel history, thread replies,
/// and permalink resolution.
#[async_trait]
pub trait ChatPlatformClient: Send + Sync {
    async fn search_messages(
        &self,
        query: &str,
        channels: &[String],
        limit: usize,
    ) -> Result<ChatSearchResponse, RetrievalError>;

    async fn conversation_history(
        &self,
        channel_id: &str,
        oldest: &str,
        latest: &str,
        inclusive: bool,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RetrievalError>;

    async fn conversation_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<ChatMessage>, RetrievalError>;

    async fn permalink(&self, channel_id: &str, ts: &str) -> Result<Option<String>, RetrievalError>;

    /// Posts `text` into `channel_id`, threaded under `thread_ts` when
    /// given. Used by the ops-bot surface to reply in the thread rooted
    /// at the triggering message.
    async fn post_reply(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), RetrievalError>;
}

pub struct HttpChatPlatformClient {
    http: reqwest::Client,
    config: ChatPlatformConfig,
    rate_limiter: Arc<RateLimiter>,
    circuit_breaker: Arc<CircuitBreaker<&'static str>>,
    retry: RetryPolicy,
}

impl HttpChatPlatformClient {
    pub fn new(
        config: ChatPlatformConfig,
        rate_limiter: Arc<RateLimiter>,
        circuit_breaker: Arc<CircuitBreaker<&'static str>>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            rate_limiter,
            circuit_breaker,
            retry: RetryPolicy::default(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value, RetrievalError> {
        if !self.circuit_breaker.is_available(&CIRCUIT_KEY) {
            return Err(RetrievalError::CircuitOpen { adapter: CIRCUIT_KEY });
        }
        if !self.rate_limiter.try_acquire_global() {
            return Err(RetrievalError::RateLimited { scope: "global" });
        }

        let url = format!("{}{}", self.config.endpoint, path);
        let result = self
            .retry
            .run(|| async {
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(&self.config.bot_token)
                    .query(query)
                    .timeout(self.config.timeout)
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            RetrievalError::Timeout(self.config.timeout)
                        } else {
                            RetrievalError::UpstreamUnavailable(e.to_string())
                        }
                    })?;

                if response.status().as_u16() == 429 {
                    if let Some(retry_after) = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                    {
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    }
                    return Err(RetrievalError::UpstreamUnavailable("rate limited by chat platform".into()));
                }
                if response.status().is_server_error() {
                    return Err(RetrievalError::UpstreamUnavailable(format!(
                        "chat platform returned {}",
                        response.status()
                    )));
                }

                Ok(response.json().await?)
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

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, RetrievalError> {
        if !self.circuit_breaker.is_available(&CIRCUIT_KEY) {
            return Err(RetrievalError::CircuitOpen { adapter: CIRCUIT_KEY });
        }
        if !self.rate_limiter.try_acquire_global() {
            return Err(RetrievalError::RateLimited { scope: "global" });
        }

        let url = format!("{}{}", self.config.endpoint, path);
        let result = self
            .retry
            .run(|| async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.config.bot_token)
                    .timeout(self.config.timeout)
                    .json(body)
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
                        "chat platform returned {}",
                        response.status()
                    )));
                }

                Ok(response.json().await?)
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

#[derive(Deserialize)]
struct RawMessage {
    channel: Option<String>,
    #[serde(default)]
    ts: String,
    user: Option<String>,
    username: Option<String>,
    #[serde(default)]
    text: String,
    thread_ts: Option<String>,
    permalink: Option<String>,
}

fn to_chat_message(raw: RawMessage, fallback_channel: &str) -> ChatMessage {
    ChatMessage {
        channel_id: raw.channel.unwrap_or_else(|| fallback_channel.to_string()),
        ts: raw.ts,
        user_id: raw.user.unwrap_or_default(),
        username: raw.username.unwrap_or_default(),
        text: raw.text,
        thread_root_ts: raw.thread_ts,
        permalink: raw.permalink,
    }
}

#[async_trait]
impl ChatPlatformClient for HttpChatPlatformClient {
    async fn search_messages(
        &self,
        query: &str,
        channels: &[String],
        limit: usize,
    ) -> Result<ChatSearchResponse, RetrievalError> {
        let channel_filter = channels.join(",");
        let limit_str = limit.to_string();
        let mut params = vec![("query", query), ("count", limit_str.as_str())];
        if !channel_filter.is_empty() {
            params.push(("channels", channel_filter.as_str()));
        }
        let body = self.get("/search.messages", &params).await?;
        let raw: Vec<RawMessage> = serde_json::from_value(
            body.get("messages")
                .and_then(|m| m.get("matches"))
                .cloned()
                .unwrap_or_default(),
        )?;
        Ok(ChatSearchResponse {
            messages: raw.into_iter().map(|m| to_chat_message(m, "")).collect(),
        })
    }

    async fn conversation_history(
        &self,
        channel_id: &str,
        oldest: &str,
        latest: &str,
        inclusive: bool,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RetrievalError> {
        let limit_str = limit.to_string();
        let inclusive_str = inclusive.to_string();
        let body = self
            .get(
                "/conversations.history",
                &[
                    ("channel", channel_id),
                    ("oldest", oldest),
                    ("latest", latest),
                    ("inclusive", inclusive_str.as_str()),
                    ("limit", limit_str.as_str()),
                ],
            )
            .await?;
        let raw: Vec<RawMessage> = serde_json::from_value(body.get("messages").cloned().unwrap_or_default())?;
        Ok(raw.into_iter().map(|m| to_chat_message(m, channel_id)).collect())
    }

    async fn conversation_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<ChatMessage>, RetrievalError> {
        let body = self
            .get("/conversations.replies", &[("channel", channel_id), ("ts", thread_ts)])
            .await?;
        let raw: Vec<RawMessage> = serde_json::from_value(body.get("messages").cloned().unwrap_or_default())?;
        Ok(raw
            .into_iter()
            .map(|m| to_chat_message(m, channel_id))
            .filter(|m| m.ts != thread_ts)
            .collect())
    }

    async fn permalink(&self, channel_id: &str, ts: &str) -> Result<Option<String>, RetrievalError> {
        let body = self
            .get("/chat.getPermalink", &[("channel", channel_id), ("message_ts", ts)])
            .await?;
        Ok(body
            .get("permalink")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    async fn post_reply(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), RetrievalError> {
        let mut body = serde_json::json!({ "channel": channel_id, "text": text });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = serde_json::Value::String(ts.to_string());
        }
        self.post("/chat.postMessage", &body).await?;
        Ok(())
    }
}
