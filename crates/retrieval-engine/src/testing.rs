//! In-process fakes for the four adapter traits, used by unit and
//! orchestrator-level tests so nothing here ever touches the network.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use retrieval_types::{ChatMessage, RetrievalError};

use crate::adapters::{
    ChatCompletionClient, ChatPlatformClient, ChatSearchResponse, ChatTurn, EmbeddingClient, IndexClient,
    IndexHit, IndexSearchResponse,
};
use crate::text_processor::{Bm25Clause, MinimumShouldMatch};

/// Returns canned hits for `search_bm25`/`search_vector`/`search_terms`
/// regardless of the query shape, or an error if configured to fail.
#[derive(Default)]
pub struct FakeIndexClient {
    pub bm25_hits: Vec<IndexHit>,
    pub vector_hits: Vec<IndexHit>,
    pub terms_hits: Vec<IndexHit>,
    pub fail_with: Option<fn() -> RetrievalError>,
}

impl FakeIndexClient {
    pub fn with_bm25_hits(hits: Vec<IndexHit>) -> Self {
        Self { bm25_hits: hits, ..Default::default() }
    }

    pub fn with_hits(bm25: Vec<IndexHit>, vector: Vec<IndexHit>) -> Self {
        Self { bm25_hits: bm25, vector_hits: vector, ..Default::default() }
    }

    pub fn failing(f: fn() -> RetrievalError) -> Self {
        Self { fail_with: Some(f), ..Default::default() }
    }
}

#[async_trait]
impl IndexClient for FakeIndexClient {
    async fn search_terms(
        &self,
        _index: &str,
        _field: &str,
        _values: &[String],
        _size: usize,
        _deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        Ok(IndexSearchResponse {
            took: Duration::from_millis(1),
            total: self.terms_hits.len(),
            hits: self.terms_hits.clone(),
        })
    }

    async fn search_bm25(
        &self,
        _index: &str,
        _clause: &Bm25Clause,
        _phrase_boost: Option<&str>,
        _min_should_match: MinimumShouldMatch,
        _filters: &BTreeMap<String, String>,
        _size: usize,
        _deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        Ok(IndexSearchResponse {
            took: Duration::from_millis(1),
            total: self.bm25_hits.len(),
            hits: self.bm25_hits.clone(),
        })
    }

    async fn search_vector(
        &self,
        _index: &str,
        _query_vector: &[f32],
        _k: usize,
        _filters: &BTreeMap<String, String>,
        _deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        Ok(IndexSearchResponse {
            took: Duration::from_millis(1),
            total: self.vector_hits.len(),
            hits: self.vector_hits.clone(),
        })
    }
}

pub struct FakeEmbeddingClient {
    pub vector: Vec<f32>,
    pub fail_with: Option<fn() -> RetrievalError>,
}

impl Default for FakeEmbeddingClient {
    fn default() -> Self {
        Self { vector: vec![0.1; crate::adapters::EMBEDDING_DIMENSIONS], fail_with: None }
    }
}

impl FakeEmbeddingClient {
    pub fn failing(f: fn() -> RetrievalError) -> Self {
        Self { vector: Vec::new(), fail_with: Some(f) }
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddingClient {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        Ok(self.vector.clone())
    }
}

/// Echoes a fixed string, or replays a queue of canned responses in
/// call order when one is supplied — the planner/verdict tests need a
/// different answer on each call within one pipeline run.
pub struct FakeChatCompletionClient {
    responses: Mutex<Vec<String>>,
    fallback: String,
}

impl FakeChatCompletionClient {
    pub fn constant(response: impl Into<String>) -> Self {
        Self { responses: Mutex::new(Vec::new()), fallback: response.into() }
    }

    pub fn sequence(responses: Vec<String>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self { responses: Mutex::new(responses), fallback: String::new() }
    }
}

#[async_trait]
impl ChatCompletionClient for FakeChatCompletionClient {
    async fn complete(&self, _turns: &[ChatTurn]) -> Result<String, RetrievalError> {
        let mut queue = self.responses.lock().unwrap();
        Ok(queue.pop().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[derive(Default)]
pub struct FakeChatPlatformClient {
    pub search_results: Vec<ChatMessage>,
    pub history: Vec<ChatMessage>,
    pub replies: Vec<ChatMessage>,
    pub permalinks: BTreeMap<String, String>,
}

#[async_trait]
impl ChatPlatformClient for FakeChatPlatformClient {
    async fn search_messages(
        &self,
        _query: &str,
        _channels: &[String],
        limit: usize,
    ) -> Result<ChatSearchResponse, RetrievalError> {
        Ok(ChatSearchResponse {
            messages: self.search_results.iter().take(limit).cloned().collect(),
        })
    }

    async fn conversation_history(
        &self,
        _channel_id: &str,
        _oldest: &str,
        _latest: &str,
        _inclusive: bool,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RetrievalError> {
        Ok(self.history.iter().take(limit).cloned().collect())
    }

    async fn conversation_replies(
        &self,
        _channel_id: &str,
        _thread_ts: &str,
    ) -> Result<Vec<ChatMessage>, RetrievalError> {
        Ok(self.replies.clone())
    }

    async fn permalink(&self, channel_id: &str, ts: &str) -> Result<Option<String>, RetrievalError> {
        Ok(self.permalinks.get(&retrieval_types::source_key(channel_id, ts)).cloned())
    }

    async fn post_reply(
        &self,
        _channel_id: &str,
        _thread_ts: Option<&str>,
        _text: &str,
    ) -> Result<(), RetrievalError> {
        Ok(())
    }
}

pub fn index_hit(id: &str, score: f32, source: serde_json::Value) -> IndexHit {
    IndexHit { index: "documents".to_string(), id: id.to_string(), score, source }
}

pub fn chat_message(channel_id: &str, ts: &str, text: &str) -> ChatMessage {
    ChatMessage {
        channel_id: channel_id.to_string(),
        ts: ts.to_string(),
        user_id: "U1".to_string(),
        username: "tester".to_string(),
        text: text.to_string(),
        thread_root_ts: None,
        permalink: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_chat_completion_replays_sequence_in_order() {
        let client = FakeChatCompletionClient::sequence(vec!["first".into(), "second".into()]);
        let turns = [ChatTurn::user("hi")];
        assert_eq!(client.complete(&turns).await.unwrap(), "first");
        assert_eq!(client.complete(&turns).await.unwrap(), "second");
        assert_eq!(client.complete(&turns).await.unwrap(), "");
    }

    #[tokio::test]
    async fn fake_index_client_returns_configured_hits() {
        let hits = vec![index_hit("a", 1.0, serde_json::json!({"title": "A"}))];
        let client = FakeIndexClient::with_bm25_hits(hits.clone());
        let response = client
            .search_bm25(
                "documents",
                &Bm25Clause { query: "x".into(), fields: vec!["content".into()] },
                None,
                MinimumShouldMatch::All,
                &BTreeMap::new(),
                10,
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(response.hits.len(), 1);
    }
}
