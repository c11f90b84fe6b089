//! Converts wire-level `HybridSearchParams` into a validated
//! `retrieval_types::Query`. Unknown enum strings fall back to the
//! default rather than failing the call — the same tolerant-parsing
//! discipline used at the LLM-facing boundary extends naturally to this
//! one.

use std::time::Duration;

use retrieval_types::{FusionMethod, Query, RetrievalError, SearchMode};

use crate::params::HybridSearchParams;

const DEFAULT_DEADLINE: Duration = Duration::from_secs(20);

pub fn build_query(params: HybridSearchParams) -> Result<Query, RetrievalError> {
    let search_mode = match params.search_mode.as_deref() {
        Some("bm25") => SearchMode::Bm25,
        Some("vector") => SearchMode::Vector,
        _ => SearchMode::Hybrid,
    };
    let fusion_method = match params.fusion_method.as_deref() {
        Some("rrf") => FusionMethod::ReciprocalRank,
        _ => FusionMethod::WeightedSum,
    };

    let mut builder = Query::builder(params.query)
        .top_k(params.top_k.unwrap_or(10))
        .search_mode(search_mode)
        .fusion_method(fusion_method)
        .min_score(params.min_score.unwrap_or(0.0))
        .include_metadata(params.include_metadata.unwrap_or(false))
        .deadline(DEFAULT_DEADLINE);

    let (bm25_weight, vector_weight) = match search_mode {
        SearchMode::Bm25 => (1.0, 0.0),
        SearchMode::Vector => (0.0, 1.0),
        SearchMode::Hybrid => (
            params.bm25_weight.unwrap_or(0.5),
            params.vector_weight.unwrap_or(0.5),
        ),
    };
    builder = builder.weights(bm25_weight, vector_weight);

    if let Some(filters) = params.filters {
        for (k, v) in filters {
            builder = builder.filter(k, v);
        }
    }

    let slack_channels = params.slack_channels.unwrap_or_default();
    builder = builder.chat_search(params.enable_slack_search.unwrap_or(false), slack_channels);

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> HybridSearchParams {
        HybridSearchParams {
            query: query.to_string(),
            top_k: None,
            filters: None,
            search_mode: None,
            bm25_weight: None,
            vector_weight: None,
            min_score: None,
            include_metadata: None,
            fusion_method: None,
            use_japanese_nlp: None,
            enable_slack_search: None,
            slack_channels: None,
            request_id: None,
        }
    }

    #[test]
    fn bm25_only_mode_zeroes_the_vector_weight() {
        let mut p = params("hello");
        p.search_mode = Some("bm25".to_string());
        let q = build_query(p).unwrap();
        assert_eq!(q.bm25_weight, 1.0);
        assert_eq!(q.vector_weight, 0.0);
    }

    #[test]
    fn unknown_search_mode_falls_back_to_hybrid() {
        let mut p = params("hello");
        p.search_mode = Some("bogus".to_string());
        let q = build_query(p).unwrap();
        assert_eq!(q.bm25_weight, 0.5);
        assert_eq!(q.vector_weight, 0.5);
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(build_query(params("   ")).is_err());
    }
}
