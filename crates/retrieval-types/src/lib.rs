//! Shared data model for the hybrid retrieval backend.
//!
//! Types here are intentionally inert: construction validates invariants,
//! but nothing here performs I/O. Adapters and the engine live in
//! `retrieval-engine`.

mod error;
mod query;
mod document;
mod chat;
mod progress;
mod circuit;

pub use error::{RetrievalError, Result};
pub use query::{FusionMethod, SearchMode, Query, QueryBuilder};
pub use document::{Document, FusionResult, SearchMethod};
pub use chat::{ChatMessage, EnrichedChatMessage, IterationRecord, ChatRetrievalResult, source_key};
pub use progress::ProgressEvent;
pub use circuit::CircuitState;
