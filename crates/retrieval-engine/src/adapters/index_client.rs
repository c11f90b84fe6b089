use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use retrieval_types::RetrievalError;

use crate::circuit_breaker::CircuitBreaker;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::text_processor::{Bm25Clause, MinimumShouldMatch};

use super::signing::sign_request;

#[derive(Debug, Clone)]
pub struct IndexClientConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexHit {
    pub index: String,
    pub id: String,
    pub score: f32,
    pub source: Value,
}

#[derive(Debug, Clone, Default)]
pub struct IndexSearchResponse {
    pub took: Duration,
    pub total: usize,
    pub hits: Vec<IndexHit>,
}

/// The three search shapes the engine issues against the document index.
#[async_trait]
pub trait IndexClient: Send + Sync {
    async fn search_terms(
        &self,
        index: &str,
        field: &str,
        values: &[String],
        size: usize,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError>;

    async fn search_bm25(
        &self,
        index: &str,
        clause: &Bm25Clause,
        phrase_boost: Option<&str>,
        min_should_match: MinimumShouldMatch,
        filters: &std::collections::BTreeMap<String, String>,
        size: usize,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError>;

    async fn search_vector(
        &self,
        index: &str,
        query_vector: &[f32],
        k: usize,
        filters: &std::collections::BTreeMap<String, String>,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError>;
}

pub struct HttpIndexClient {
    http: reqwest::Client,
    config: IndexClientConfig,
    rate_limiter: Arc<RateLimiter>,
    circuit_breaker: Arc<CircuitBreaker<&'static str>>,
    retry: RetryPolicy,
}

const CIRCUIT_KEY: &str = "index";

impl HttpIndexClient {
    pub fn new(
        config: IndexClientConfig,
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

    fn guard(&self) -> Result<(), RetrievalError> {
        if !self.circuit_breaker.is_available(&CIRCUIT_KEY) {
            return Err(RetrievalError::CircuitOpen { adapter: CIRCUIT_KEY });
        }
        if !self.rate_limiter.try_acquire_global() {
            return Err(RetrievalError::RateLimited { scope: "global" });
        }
        Ok(())
    }

    async fn post_search(
        &self,
        index: &str,
        body: Value,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        self.guard()?;
        let path = format!("/{index}/_search");
        let url = format!("{}{}", self.config.endpoint, path);
        let payload = serde_json::to_vec(&body)?;
        let signed = sign_request(&self.config.secret_key, "POST", &path, &payload);

        let result = self
            .retry
            .run(|| {
                let url = url.clone();
                let payload = payload.clone();
                let signed_sig = signed.signature.clone();
                async move {
                    let response = self
                        .http
                        .post(&url)
                        .header("x-index-access-key", &self.config.access_key)
                        .header("x-index-signature", &signed_sig)
                        .header("content-type", "application/json")
                        .timeout(deadline.min(self.config.timeout))
                        .body(payload)
                        .send()
                        .await
                        .map_err(|e| {
                            if e.is_timeout() {
                                RetrievalError::Timeout(deadline)
                            } else {
                                RetrievalError::UpstreamUnavailable(e.to_string())
                            }
                        })?;

                    if response.status().is_server_error() || response.status().as_u16() == 429 {
                        return Err(RetrievalError::UpstreamUnavailable(format!(
                            "index returned {}",
                            response.status()
                        )));
                    }
                    if !response.status().is_success() {
                        return Err(RetrievalError::InvalidInput(format!(
                            "index rejected request: {}",
                            response.status()
                        )));
                    }

                    let parsed: RawEsResponse = response.json().await?;
                    Ok(parsed.into())
                }
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

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn search_terms(
        &self,
        index: &str,
        field: &str,
        values: &[String],
        size: usize,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        let mut seen = std::collections::BTreeSet::new();
        let deduped: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| seen.insert(*v))
            .collect();
        let body = serde_json::json!({
            "size": size,
            "query": { "terms": { field: deduped } }
        });
        self.post_search(index, body, deadline).await
    }

    async fn search_bm25(
        &self,
        index: &str,
        clause: &Bm25Clause,
        phrase_boost: Option<&str>,
        min_should_match: MinimumShouldMatch,
        filters: &std::collections::BTreeMap<String, String>,
        size: usize,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        let mmm = match min_should_match {
            MinimumShouldMatch::All => "100%".to_string(),
            MinimumShouldMatch::Percent(p) => format!("{p}%"),
        };
        let mut should = vec![serde_json::json!({
            "multi_match": {
                "query": clause.query,
                "fields": clause.fields,
                "minimum_should_match": mmm,
            }
        })];
        if let Some(phrase) = phrase_boost {
            should.push(serde_json::json!({
                "match_phrase": { "content": { "query": phrase, "boost": 2.0 } }
            }));
        }
        let filter: Vec<Value> = filters
            .iter()
            .map(|(k, v)| serde_json::json!({ "term": { k: v } }))
            .collect();
        let body = serde_json::json!({
            "size": size,
            "query": { "bool": { "should": should, "filter": filter } }
        });
        self.post_search(index, body, deadline).await
    }

    async fn search_vector(
        &self,
        index: &str,
        query_vector: &[f32],
        k: usize,
        filters: &std::collections::BTreeMap<String, String>,
        deadline: Duration,
    ) -> Result<IndexSearchResponse, RetrievalError> {
        let filter: Vec<Value> = filters
            .iter()
            .map(|(key, v)| serde_json::json!({ "term": { key: v } }))
            .collect();
        let body = serde_json::json!({
            "knn": {
                "field": "embedding",
                "query_vector": query_vector,
                "k": k,
                "num_candidates": (k * 10).max(50),
                "filter": filter,
            }
        });
        self.post_search(index, body, deadline)
            .await
            .map(|mut r| {
                r.hits.truncate(k);
                r
            })
    }
}

#[derive(Debug, Deserialize)]
struct RawEsResponse {
    took: u64,
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: RawTotal,
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawTotal {
    value: usize,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: f32,
    #[serde(rename = "_source")]
    source: Value,
}

impl From<RawEsResponse> for IndexSearchResponse {
    fn from(raw: RawEsResponse) -> Self {
        Self {
            took: Duration::from_millis(raw.took),
            total: raw.hits.total.value,
            hits: raw
                .hits
                .hits
                .into_iter()
                .map(|h| IndexHit {
                    index: h.index,
                    id: h.id,
                    score: h.score,
                    source: h.source,
                })
                .collect(),
        }
    }
}
