use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// A single chat-platform message. Identity is `(channel_id, ts)` — the
/// platform's own timestamp format ("seconds.micros" as a string) is kept
/// verbatim rather than parsed, since it doubles as a stable sort key and
/// as the API's own pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub channel_id: String,
    pub ts: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub thread_root_ts: Option<String>,
    pub permalink: Option<String>,
}

impl ChatMessage {
    pub fn identity(&self) -> (&str, &str) {
        (self.channel_id.as_str(), self.ts.as_str())
    }

    pub fn is_thread_reply(&self) -> bool {
        self.thread_root_ts
            .as_ref()
            .is_some_and(|root| root != &self.ts)
    }
}

/// A [`ChatMessage`] enriched with thread context and a temporal window,
/// per the enrichment step of the iterative refinement pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedChatMessage {
    pub message: ChatMessage,
    pub thread_replies: Vec<ChatMessage>,
    pub window_before: Vec<ChatMessage>,
    pub window_after: Vec<ChatMessage>,
}

impl EnrichedChatMessage {
    pub fn identity(&self) -> (&str, &str) {
        self.message.identity()
    }
}

/// Record of one PLAN/SEARCH/CHECK cycle of the refinement state machine.
/// Append-only within a pipeline run — iteration indices are strictly
/// increasing and no entry is ever rewritten.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub index: usize,
    pub queries_tried: Vec<String>,
    pub matches_returned: usize,
    pub is_sufficient: bool,
    pub missing_info: Vec<String>,
    pub confidence: f32,
    #[serde(with = "crate::document::duration_millis")]
    pub elapsed: Duration,
}

/// The pipeline's final output: deduplicated enriched messages plus the
/// bookkeeping a caller needs to judge how thorough the search was.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRetrievalResult {
    pub enriched: Vec<EnrichedChatMessage>,
    pub queries_used: Vec<String>,
    pub iteration_count: usize,
    pub iterations: Vec<IterationRecord>,
    pub total_matches: usize,
    pub is_sufficient: bool,
    pub missing_info: Vec<String>,
    pub confidence: f32,
    #[serde(with = "crate::document::duration_millis")]
    pub elapsed: Duration,
    /// "{channel}:{ts}" -> permalink, for surfaces that want to cite sources.
    pub source_map: BTreeMap<String, String>,
}

impl ChatRetrievalResult {
    pub fn empty() -> Self {
        Self {
            enriched: Vec::new(),
            queries_used: Vec::new(),
            iteration_count: 0,
            iterations: Vec::new(),
            total_matches: 0,
            is_sufficient: false,
            missing_info: Vec::new(),
            confidence: 0.0,
            elapsed: Duration::ZERO,
            source_map: BTreeMap::new(),
        }
    }
}

/// Builds the `source_map` key for a message identity.
pub fn source_key(channel_id: &str, ts: &str) -> String {
    format!("{channel_id}:{ts}")
}
