//! The per-request façade used by all three surfaces: composes
//! the fusion engine with the chat-refinement pipeline, builds the
//! final prompt, and invokes chat completion.

use std::sync::Arc;

use retrieval_types::{
    ChatRetrievalResult, Document, FusionResult, ProgressEvent, Query, RetrievalError, SearchMethod,
};

use crate::adapters::{ChatCompletionClient, ChatTurn};
use crate::fusion::HybridSearchEngine;
use crate::pipeline::SlackRetrievalPipeline;
use crate::progress_stream::ProgressStream;

const SYSTEM_PROMPT: &str = "You are a retrieval assistant. Answer the user's question using only \
the context provided below. If the context does not contain the answer, say so plainly. Do not \
invent facts or cite sources that are not present in the context.";

const NO_INFORMATION_FOUND: &str =
    "I couldn't find any information to answer that question in the indexed documents or chat history.";

pub struct HybridSearchOrchestrator {
    engine: Arc<HybridSearchEngine>,
    pipeline: Arc<SlackRetrievalPipeline>,
    chat_completion: Arc<dyn ChatCompletionClient>,
    index_name: String,
}

/// The composed result of one request: the answer text plus the raw
/// retrieval artifacts a surface may want to render alongside it.
#[derive(Debug, Clone)]
pub struct OrchestratorResponse {
    pub answer: String,
    pub fusion: Option<FusionResult>,
    pub chat: Option<ChatRetrievalResult>,
    pub search_method: SearchMethod,
}

/// The raw retrieval half of a request, before prompt composition and
/// chat completion. Surfaces that want structured results rather than
/// a generated answer (the MCP `hybrid_search` tool) call
/// [`HybridSearchOrchestrator::retrieve`] directly instead of
/// [`HybridSearchOrchestrator::handle`].
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub fusion: Option<FusionResult>,
    pub chat: Option<ChatRetrievalResult>,
    pub search_method: SearchMethod,
}

impl HybridSearchOrchestrator {
    pub fn new(
        engine: Arc<HybridSearchEngine>,
        pipeline: Arc<SlackRetrievalPipeline>,
        chat_completion: Arc<dyn ChatCompletionClient>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            pipeline,
            chat_completion,
            index_name: index_name.into(),
        }
    }

    /// Runs the document fusion search and (if enabled) the chat
    /// refinement pipeline in parallel against a shared deadline and
    /// returns whatever came back, without composing a prompt or
    /// calling the chat completion model. `Err` only for `InvalidInput`;
    /// a failure in one branch degrades `search_method` rather than
    /// failing the request.
    pub async fn retrieve(&self, query: &Query, progress: &ProgressStream) -> Result<RetrievalOutcome, RetrievalError> {
        if query.text.trim().is_empty() {
            return Err(RetrievalError::InvalidInput("query text must not be empty".into()));
        }

        progress.publish(ProgressEvent::SearchStarted);

        let fusion_fut = self.engine.search(query, &self.index_name);
        let chat_fut = async {
            if query.chat_search_enabled {
                Some(
                    self.pipeline
                        .run(&query.text, &query.chat_channel_filter, Some(progress))
                        .await,
                )
            } else {
                None
            }
        };

        let (fusion_result, chat_result) = tokio::join!(fusion_fut, chat_fut);

        if let Ok(ref fusion) = fusion_result {
            progress.publish(ProgressEvent::FusionComplete {
                total: fusion.total,
                method: fusion.search_method.as_str().to_string(),
            });
        }

        let fusion = fusion_result.ok();
        let chat = chat_result.and_then(|r| r.ok());

        if let Some(chat) = &chat {
            progress.publish(ProgressEvent::ChatSearchComplete {
                total: chat.total_matches,
                is_sufficient: chat.is_sufficient,
            });
        }

        let search_method = match (&fusion, &chat) {
            (Some(f), _) => f.search_method,
            (None, Some(_)) => SearchMethod::SlackOnly,
            (None, None) => SearchMethod::HybridSearch,
        };

        Ok(RetrievalOutcome { fusion, chat, search_method })
    }

    /// Runs one request end to end. Returns `Err` only for conditions
    /// that must not be recovered from (`InvalidInput`); partial
    /// retrieval failures degrade to a narrower answer instead of
    /// propagating.
    pub async fn handle(&self, query: &Query, progress: &ProgressStream) -> Result<OrchestratorResponse, RetrievalError> {
        let outcome = self.retrieve(query, progress).await?;
        let (fusion, chat, search_method) = (outcome.fusion, outcome.chat, outcome.search_method);

        let has_doc_context = fusion.as_ref().is_some_and(|f| !f.documents.is_empty());
        let has_chat_context = chat.as_ref().is_some_and(|c| !c.enriched.is_empty());
        if !has_doc_context && !has_chat_context {
            return Ok(OrchestratorResponse {
                answer: NO_INFORMATION_FOUND.to_string(),
                fusion,
                chat,
                search_method,
            });
        }

        let prompt = compose_context(fusion.as_ref(), chat.as_ref());
        let turns = [
            ChatTurn::system(SYSTEM_PROMPT),
            ChatTurn::user(format!("{prompt}\n\nQuestion: {}", query.text)),
        ];

        progress.publish(ProgressEvent::LlmStarted);
        let answer = match self.chat_completion.complete(&turns).await {
            Ok(text) => {
                progress.publish(ProgressEvent::LlmFinished);
                append_references(text, fusion.as_ref())
            }
            Err(e) => {
                progress.publish(ProgressEvent::Error { message: e.to_string() });
                return Err(RetrievalError::CompositionFailed(e.to_string()));
            }
        };

        Ok(OrchestratorResponse {
            answer,
            fusion,
            chat,
            search_method,
        })
    }
}

fn compose_context(fusion: Option<&FusionResult>, chat: Option<&ChatRetrievalResult>) -> String {
    let mut sections = Vec::new();

    if let Some(fusion) = fusion {
        if !fusion.documents.is_empty() {
            let excerpts: Vec<String> = fusion.documents.iter().map(format_document_excerpt).collect();
            sections.push(excerpts.join("\n\n---\n\n"));
        }
    }

    if let Some(chat) = chat {
        if !chat.enriched.is_empty() {
            sections.push(format_chat_context(chat));
        }
    }

    sections.join("\n\n---\n\n")
}

fn format_document_excerpt(doc: &Document) -> String {
    let title = doc.source.get("title").and_then(|v| v.as_str()).unwrap_or(&doc.id);
    let content = doc.source.get("content").and_then(|v| v.as_str()).unwrap_or("");
    format!("### {title}\n{content}")
}

fn format_chat_context(chat: &ChatRetrievalResult) -> String {
    chat.enriched
        .iter()
        .map(|m| {
            let mut block = format!(
                "[{}] {} ({}): {}",
                m.message.channel_id, m.message.username, m.message.ts, m.message.text
            );
            for reply in &m.thread_replies {
                block.push_str(&format!("\n  - {}: {}", reply.username, reply.text));
            }
            for before in &m.window_before {
                block.push_str(&format!("\n  > {}: {}", before.username, before.text));
            }
            for after in &m.window_after {
                block.push_str(&format!("\n  < {}: {}", after.username, after.text));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn append_references(answer: String, fusion: Option<&FusionResult>) -> String {
    let Some(fusion) = fusion else { return answer };
    if fusion.documents.is_empty() {
        return answer;
    }

    let mut out = answer;
    out.push_str("\n\nReferences:\n");
    for doc in &fusion.documents {
        let title = doc.source.get("title").and_then(|v| v.as_str()).unwrap_or(&doc.id);
        let reference = doc
            .source
            .get("reference")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| {
                doc.source
                    .get("file_path")
                    .and_then(|v| v.as_str())
                    .map(repo_path_to_url)
            })
            .unwrap_or_default();
        out.push_str(&format!("- {title}: {reference}\n"));
    }
    out
}

/// Converts a repository-relative file path into the source browsing
/// URL scheme this corpus uses, for documents with no canonical
/// `reference` field of their own.
fn repo_path_to_url(path: &str) -> String {
    format!("file://{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use retrieval_types::{Document, FusionResult, SearchMethod};

    fn doc(id: &str, title: &str) -> Document {
        Document {
            id: id.to_string(),
            index: "docs".to_string(),
            source: serde_json::json!({ "title": title, "content": "body text", "reference": "https://x/y" }),
            bm25_score: Some(1.0),
            vector_score: None,
            fused_score: 1.0,
            rank: 1,
        }
    }

    #[test]
    fn context_sections_are_separated_by_the_literal_marker() {
        let fusion = FusionResult {
            documents: vec![doc("a", "Doc A"), doc("b", "Doc B")],
            total: 2,
            search_method: SearchMethod::HybridSearch,
            took: Duration::ZERO,
            url_detected: false,
            fallback_reason: None,
        };
        let context = compose_context(Some(&fusion), None);
        assert!(context.contains("\n\n---\n\n"));
        assert!(context.contains("Doc A"));
        assert!(context.contains("Doc B"));
    }

    #[test]
    fn references_section_lists_every_document_title() {
        let fusion = FusionResult {
            documents: vec![doc("a", "Doc A")],
            total: 1,
            search_method: SearchMethod::HybridSearch,
            took: Duration::ZERO,
            url_detected: false,
            fallback_reason: None,
        };
        let out = append_references("answer text".to_string(), Some(&fusion));
        assert!(out.contains("References:"));
        assert!(out.contains("Doc A: https://x/y"));
    }

    #[test]
    fn no_fusion_result_leaves_answer_unchanged() {
        let out = append_references("answer text".to_string(), None);
        assert_eq!(out, "answer text");
    }
}
