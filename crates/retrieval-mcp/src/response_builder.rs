//! Flattens a `RetrievalOutcome` into the wire shape of the
//! `hybrid_search` tool response.

use retrieval_engine::RetrievalOutcome;
use retrieval_types::Query;

use crate::params::{DocumentResult, HybridSearchResponse, ResponseMetadata, SearchSource, SlackResult};

pub fn build_response(query: &Query, outcome: RetrievalOutcome) -> HybridSearchResponse {
    let RetrievalOutcome { fusion, chat, search_method } = outcome;

    let (total, url_detected, fallback_reason, took_ms, results, search_sources) = match &fusion {
        Some(f) => (
            f.total,
            f.url_detected,
            f.fallback_reason.clone(),
            f.took.as_millis(),
            f.documents
                .iter()
                .map(|d| DocumentResult {
                    id: d.id.clone(),
                    index: d.index.clone(),
                    bm25_score: d.bm25_score,
                    vector_score: d.vector_score,
                    fused_score: d.fused_score,
                    rank: d.rank,
                    source: query.include_metadata.then(|| d.source.clone()),
                })
                .collect(),
            f.documents
                .iter()
                .map(|d| SearchSource {
                    title: d
                        .source
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&d.id)
                        .to_string(),
                    reference: d
                        .source
                        .get("reference")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect(),
        ),
        None => (0, false, None, 0, Vec::new(), Vec::new()),
    };

    let slack_results = chat
        .as_ref()
        .map(|c| {
            c.enriched
                .iter()
                .map(|m| SlackResult {
                    channel_id: m.message.channel_id.clone(),
                    ts: m.message.ts.clone(),
                    username: m.message.username.clone(),
                    text: m.message.text.clone(),
                    permalink: m.message.permalink.clone(),
                    thread_reply_count: m.thread_replies.len(),
                })
                .collect()
        })
        .unwrap_or_default();

    let metadata = ResponseMetadata {
        took_ms,
        fallback_reason: fallback_reason.clone(),
        chat_iteration_count: chat.as_ref().map(|c| c.iteration_count).unwrap_or(0),
        chat_is_sufficient: chat.as_ref().map(|c| c.is_sufficient).unwrap_or(false),
        chat_missing_info: chat.as_ref().map(|c| c.missing_info.clone()).unwrap_or_default(),
    };

    HybridSearchResponse {
        query: query.text.clone(),
        total,
        search_mode: format!("{:?}", query.search_mode).to_lowercase(),
        search_method: search_method.as_str().to_string(),
        url_detected,
        fallback_reason,
        results,
        metadata,
        slack_results,
        search_sources,
    }
}
