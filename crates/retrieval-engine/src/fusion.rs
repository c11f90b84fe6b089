//! The fusion core: URL fast path, parallel BM25/vector dispatch, and
//! weighted-sum or reciprocal-rank fusion with deterministic tie-breaks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use retrieval_types::{Document, FusionMethod, FusionResult, Query, RetrievalError, SearchMethod, SearchMode};

use crate::adapters::{EmbeddingClient, IndexClient};
use crate::text_processor::TextProcessor;
use crate::url_detector::UrlDetector;

const RRF_K: f32 = 60.0;
const URL_FAST_PATH_DEADLINE: Duration = Duration::from_millis(200);
const SUB_DEADLINE_FLOOR: Duration = Duration::from_millis(50);

pub struct HybridSearchEngine {
    index_client: Arc<dyn IndexClient>,
    embedding_client: Arc<dyn EmbeddingClient>,
    text_processor: TextProcessor,
}

impl HybridSearchEngine {
    pub fn new(index_client: Arc<dyn IndexClient>, embedding_client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            index_client,
            embedding_client,
            text_processor: TextProcessor::default(),
        }
    }

    pub async fn search(&self, query: &Query, index: &str) -> Result<FusionResult, RetrievalError> {
        let started = Instant::now();

        let detection = UrlDetector::detect(&query.text);
        if detection.has_url {
            let fast_path_deadline = URL_FAST_PATH_DEADLINE.min(query.deadline);
            let term_result = tokio::time::timeout(
                fast_path_deadline,
                self.index_client.search_terms(index, "reference", &detection.urls, query.top_k, fast_path_deadline),
            )
            .await;

            match term_result {
                Ok(Ok(response)) if response.total > 0 => {
                    let mut result = self.to_fusion_result(response, SearchMethod::UrlExactMatch, query);
                    result.url_detected = true;
                    result.took = started.elapsed();
                    return Ok(result);
                }
                Ok(Ok(_)) => { /* 0 hits, fall through to hybrid */ }
                Ok(Err(_)) | Err(_) => { /* timed out or failed, fall through */ }
            }
        }

        if query.top_k == 0 {
            let mut result = FusionResult::empty(SearchMethod::HybridSearch);
            result.url_detected = detection.has_url;
            return Ok(result);
        }

        let processed = self.text_processor.process(&query.text);

        let query_vector = if query.search_mode != SearchMode::Bm25 {
            Some(self.embedding_client.embed(&query.text).await?)
        } else {
            None
        };

        let sub_deadline = (query.deadline / 2).max(SUB_DEADLINE_FLOOR);

        let bm25_fut = async {
            if query.search_mode == SearchMode::Vector {
                return None;
            }
            Some(
                self.index_client
                    .search_bm25(
                        index,
                        &processed.bm25_clause,
                        processed.phrase_boost.as_deref(),
                        processed.minimum_should_match,
                        &query.filters,
                        query.top_k,
                        sub_deadline,
                    )
                    .await,
            )
        };

        let vector_fut = async {
            let vector = query_vector.as_ref()?;
            Some(
                self.index_client
                    .search_vector(index, vector, query.top_k, &query.filters, sub_deadline)
                    .await,
            )
        };

        let (bm25_res, vector_res) = tokio::join!(bm25_fut, vector_fut);

        let bm25_ok = bm25_res.and_then(|r| r.ok());
        let vector_ok = vector_res.and_then(|r| r.ok());

        let mut fallback_reason = None;
        let search_method = match (&bm25_ok, &vector_ok) {
            (Some(_), Some(_)) => SearchMethod::HybridSearch,
            (Some(_), None) => {
                fallback_reason = Some("vector search failed or was skipped".to_string());
                SearchMethod::Bm25Only
            }
            (None, Some(_)) => {
                fallback_reason = Some("bm25 search failed or was skipped".to_string());
                SearchMethod::VectorOnly
            }
            (None, None) => return Err(RetrievalError::SearchUnavailable),
        };

        let fused = fuse(
            bm25_ok.as_ref().map(|r| r.hits.as_slice()).unwrap_or(&[]),
            vector_ok.as_ref().map(|r| r.hits.as_slice()).unwrap_or(&[]),
            query,
        );

        let mut result = FusionResult {
            documents: fused,
            total: 0,
            search_method,
            took: started.elapsed(),
            url_detected: detection.has_url,
            fallback_reason,
        };
        result.total = result.documents.len();
        Ok(result)
    }

    fn to_fusion_result(
        &self,
        response: crate::adapters::IndexSearchResponse,
        method: SearchMethod,
        query: &Query,
    ) -> FusionResult {
        let documents = response
            .hits
            .into_iter()
            .take(query.top_k.max(1))
            .enumerate()
            .map(|(i, hit)| Document {
                id: hit.id,
                index: hit.index,
                source: hit.source,
                bm25_score: Some(hit.score),
                vector_score: None,
                fused_score: hit.score,
                rank: i + 1,
            })
            .collect::<Vec<_>>();
        FusionResult {
            total: documents.len(),
            documents,
            search_method: method,
            took: response.took,
            url_detected: false,
            fallback_reason: None,
        }
    }
}

fn fuse(bm25: &[crate::adapters::IndexHit], vector: &[crate::adapters::IndexHit], query: &Query) -> Vec<Document> {
    let mut merged: BTreeMap<(String, String), Document> = BTreeMap::new();

    let bm25_min_max = min_max(bm25.iter().map(|h| h.score));
    let vector_min_max = min_max(vector.iter().map(|h| h.score));

    for (rank, hit) in bm25.iter().enumerate() {
        let key = (hit.index.clone(), hit.id.clone());
        let entry = merged.entry(key).or_insert_with(|| Document {
            id: hit.id.clone(),
            index: hit.index.clone(),
            source: hit.source.clone(),
            bm25_score: None,
            vector_score: None,
            fused_score: 0.0,
            rank: 0,
        });
        entry.bm25_score = Some(hit.score);
        entry.fused_score += contribution(
            query.fusion_method,
            query.bm25_weight,
            hit.score,
            bm25_min_max,
            rank,
        );
    }

    for (rank, hit) in vector.iter().enumerate() {
        let key = (hit.index.clone(), hit.id.clone());
        let entry = merged.entry(key).or_insert_with(|| Document {
            id: hit.id.clone(),
            index: hit.index.clone(),
            source: hit.source.clone(),
            bm25_score: None,
            vector_score: None,
            fused_score: 0.0,
            rank: 0,
        });
        entry.vector_score = Some(hit.score);
        entry.fused_score += contribution(
            query.fusion_method,
            query.vector_weight,
            hit.score,
            vector_min_max,
            rank,
        );
    }

    let mut docs: Vec<Document> = merged
        .into_values()
        .filter(|d| d.fused_score >= query.min_score)
        .collect();

    docs.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.bm25_score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.bm25_score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                b.vector_score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.vector_score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    docs.truncate(query.top_k);
    for (i, doc) in docs.iter_mut().enumerate() {
        doc.rank = i + 1;
    }
    docs
}

fn contribution(
    method: FusionMethod,
    weight: f32,
    score: f32,
    min_max: Option<(f32, f32)>,
    rank: usize,
) -> f32 {
    match method {
        FusionMethod::WeightedSum => {
            let normalized = match min_max {
                Some((min, max)) if max > min => (score - min) / (max - min),
                _ => 1.0,
            };
            weight * normalized
        }
        FusionMethod::ReciprocalRank => weight * (1.0 / (RRF_K + rank as f32 + 1.0)),
    }
}

fn min_max(scores: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut any = false;
    for s in scores {
        any = true;
        min = min.min(s);
        max = max.max(s);
    }
    any.then_some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::IndexHit;
    use retrieval_types::QueryBuilder;

    fn hit(id: &str, score: f32) -> IndexHit {
        IndexHit {
            index: "docs".to_string(),
            id: id.to_string(),
            score,
            source: serde_json::json!({}),
        }
    }

    #[test]
    fn bm25_only_weighting_preserves_bm25_ranking() {
        let query = Query::builder("q").weights(1.0, 0.0).top_k(10).build().unwrap();
        let bm25 = vec![hit("a", 9.0), hit("b", 5.0), hit("c", 1.0)];
        let docs = fuse(&bm25, &[], &query);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn fusing_identical_lists_preserves_order() {
        let query = Query::builder("q").weights(0.5, 0.5).top_k(10).build().unwrap();
        let list = vec![hit("a", 9.0), hit("b", 5.0)];
        let docs = fuse(&list, &list, &query);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn min_score_filters_out_everything() {
        let query = Query::builder("q")
            .weights(1.0, 0.0)
            .min_score(1000.0)
            .build()
            .unwrap();
        let docs = fuse(&[hit("a", 9.0)], &[], &query);
        assert!(docs.is_empty());
    }

    #[test]
    fn tie_break_falls_back_to_id_order() {
        let query = Query::builder("q").weights(1.0, 0.0).top_k(10).build().unwrap();
        let bm25 = vec![hit("z", 5.0), hit("a", 5.0)];
        let docs = fuse(&bm25, &[], &query);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z"]);
    }
}
