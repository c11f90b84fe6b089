use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RetrievalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    WeightedSum,
    #[serde(rename = "rrf")]
    ReciprocalRank,
}

impl Default for FusionMethod {
    fn default() -> Self {
        FusionMethod::WeightedSum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Hybrid,
    Bm25,
    Vector,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Hybrid
    }
}

/// An immutable retrieval request. Built once at a surface's ingress and
/// never mutated afterward — the orchestrator and engine only ever read it.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub top_k: usize,
    pub filters: BTreeMap<String, String>,
    pub fusion_method: FusionMethod,
    pub search_mode: SearchMode,
    pub bm25_weight: f32,
    pub vector_weight: f32,
    pub min_score: f32,
    pub include_metadata: bool,
    pub chat_search_enabled: bool,
    pub chat_channel_filter: Vec<String>,
    pub deadline: Duration,
}

const MAX_TOP_K: usize = 100;
const MAX_DEADLINE: Duration = Duration::from_secs(60);

impl Query {
    pub fn builder(text: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(text)
    }
}

/// Constructs a [`Query`], applying the invariants from the data model:
/// non-empty text, `top_k` within `1..=100` (0 is allowed and means "no
/// results, not an error" per the engine's boundary behavior), and
/// `bm25_weight + vector_weight > 0`.
pub struct QueryBuilder {
    text: String,
    top_k: usize,
    filters: BTreeMap<String, String>,
    fusion_method: FusionMethod,
    search_mode: SearchMode,
    bm25_weight: f32,
    vector_weight: f32,
    min_score: f32,
    include_metadata: bool,
    chat_search_enabled: bool,
    chat_channel_filter: Vec<String>,
    deadline: Duration,
}

impl QueryBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: 10,
            filters: BTreeMap::new(),
            fusion_method: FusionMethod::default(),
            search_mode: SearchMode::default(),
            bm25_weight: 0.5,
            vector_weight: 0.5,
            min_score: 0.0,
            include_metadata: false,
            chat_search_enabled: false,
            chat_channel_filter: Vec::new(),
            deadline: Duration::from_secs(30),
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn fusion_method(mut self, method: FusionMethod) -> Self {
        self.fusion_method = method;
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn weights(mut self, bm25: f32, vector: f32) -> Self {
        self.bm25_weight = bm25;
        self.vector_weight = vector;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn chat_search(mut self, enabled: bool, channels: Vec<String>) -> Self {
        self.chat_search_enabled = enabled;
        self.chat_channel_filter = channels;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn build(self) -> Result<Query> {
        if self.text.trim().is_empty() {
            return Err(RetrievalError::InvalidInput(
                "query text must not be empty".into(),
            ));
        }
        if self.top_k > MAX_TOP_K {
            return Err(RetrievalError::InvalidInput(format!(
                "top_k must be <= {MAX_TOP_K}"
            )));
        }
        if self.bm25_weight <= 0.0 && self.vector_weight <= 0.0 {
            return Err(RetrievalError::InvalidInput(
                "bm25_weight and vector_weight cannot both be zero".into(),
            ));
        }
        if self.deadline > MAX_DEADLINE {
            return Err(RetrievalError::InvalidInput(
                "deadline must be <= 60s".into(),
            ));
        }
        Ok(Query {
            text: self.text,
            top_k: self.top_k,
            filters: self.filters,
            fusion_method: self.fusion_method,
            search_mode: self.search_mode,
            bm25_weight: self.bm25_weight,
            vector_weight: self.vector_weight,
            min_score: self.min_score,
            include_metadata: self.include_metadata,
            chat_search_enabled: self.chat_search_enabled,
            chat_channel_filter: self.chat_channel_filter,
            deadline: self.deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        assert!(Query::builder("   ").build().is_err());
    }

    #[test]
    fn zero_weights_are_rejected() {
        assert!(Query::builder("hello").weights(0.0, 0.0).build().is_err());
    }

    #[test]
    fn top_k_zero_is_allowed() {
        let q = Query::builder("hello").top_k(0).build().unwrap();
        assert_eq!(q.top_k, 0);
    }

    #[test]
    fn defaults_are_sane() {
        let q = Query::builder("hello").build().unwrap();
        assert_eq!(q.top_k, 10);
        assert_eq!(q.fusion_method, FusionMethod::WeightedSum);
    }
}
