use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// One hit, after fusion. `bm25_score`/`vector_score` are `None` when the
/// document was absent from that branch's result list.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub index: String,
    pub source: Value,
    pub bm25_score: Option<f32>,
    pub vector_score: Option<f32>,
    pub fused_score: f32,
    pub rank: usize,
}

impl Document {
    pub fn identity(&self) -> (&str, &str) {
        (self.index.as_str(), self.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    UrlExactMatch,
    HybridSearch,
    Bm25Only,
    VectorOnly,
    SlackOnly,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::UrlExactMatch => "url_exact_match",
            SearchMethod::HybridSearch => "hybrid_search",
            SearchMethod::Bm25Only => "bm25_only",
            SearchMethod::VectorOnly => "vector_only",
            SearchMethod::SlackOnly => "slack_only",
        }
    }
}

/// The engine's output for one request: a ranked document list plus the
/// bookkeeping needed to explain how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct FusionResult {
    pub documents: Vec<Document>,
    pub total: usize,
    pub search_method: SearchMethod,
    #[serde(with = "duration_millis")]
    pub took: Duration,
    pub url_detected: bool,
    pub fallback_reason: Option<String>,
}

impl FusionResult {
    pub fn empty(search_method: SearchMethod) -> Self {
        Self {
            documents: Vec::new(),
            total: 0,
            search_method,
            took: Duration::ZERO,
            url_detected: false,
            fallback_reason: None,
        }
    }
}

pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}
