//! Request/response shapes for the `hybrid_search` MCP tool.

use std::collections::BTreeMap;

use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HybridSearchParams {
    #[schemars(description = "The text to search for. Required, must not be empty.")]
    pub query: String,
    #[schemars(description = "Maximum number of document results to return (1-100, default 10)")]
    pub top_k: Option<usize>,
    #[schemars(description = "Exact-match filters passed through to the document index")]
    pub filters: Option<BTreeMap<String, String>>,
    #[schemars(description = "\"hybrid\" (default), \"bm25\", or \"vector\"")]
    pub search_mode: Option<String>,
    #[schemars(description = "Weight given to the BM25 branch when fusing (0..1)")]
    pub bm25_weight: Option<f32>,
    #[schemars(description = "Weight given to the vector branch when fusing (0..1)")]
    pub vector_weight: Option<f32>,
    #[schemars(description = "Drop fused results scoring below this threshold")]
    pub min_score: Option<f32>,
    #[schemars(description = "Include each document's full source payload in the response")]
    pub include_metadata: Option<bool>,
    #[schemars(description = "\"weighted_sum\" (default) or \"rrf\"")]
    pub fusion_method: Option<String>,
    #[schemars(description = "Japanese-aware tokenization toggle; accepted but currently a no-op")]
    pub use_japanese_nlp: Option<bool>,
    #[schemars(description = "Also mine the chat corpus via the iterative refinement pipeline")]
    pub enable_slack_search: Option<bool>,
    #[schemars(description = "Restrict chat search to these channel names (no leading '#')")]
    pub slack_channels: Option<Vec<String>>,
    #[schemars(description = "Client-chosen id to correlate this call with a /progress/{id} SSE subscription")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResult {
    pub id: String,
    pub index: String,
    pub bm25_score: Option<f32>,
    pub vector_score: Option<f32>,
    pub fused_score: f32,
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SlackResult {
    pub channel_id: String,
    pub ts: String,
    pub username: String,
    pub text: String,
    pub permalink: Option<String>,
    pub thread_reply_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchSource {
    pub title: String,
    pub reference: String,
}

#[derive(Debug, Serialize, Default)]
pub struct ResponseMetadata {
    pub took_ms: u128,
    pub fallback_reason: Option<String>,
    pub chat_iteration_count: usize,
    pub chat_is_sufficient: bool,
    pub chat_missing_info: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HybridSearchResponse {
    pub query: String,
    pub total: usize,
    pub search_mode: String,
    pub search_method: String,
    pub url_detected: bool,
    pub fallback_reason: Option<String>,
    pub results: Vec<DocumentResult>,
    pub metadata: ResponseMetadata,
    pub slack_results: Vec<SlackResult>,
    pub search_sources: Vec<SearchSource>,
}
