use serde::Serialize;

/// Advisory, per-request progress. Subscribers may drop events under
/// backpressure (see `ProgressStream` in `retrieval-engine`); nothing in
/// the pipeline depends on a subscriber having seen one.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    QueryPlanned { queries: Vec<String> },
    SearchStarted,
    FusionComplete { total: usize, method: String },
    IterationStarted { index: usize, max: usize },
    IterationFinished { index: usize, max: usize, matches: usize },
    ChatSearchComplete { total: usize, is_sufficient: bool },
    LlmStarted,
    LlmFinished,
    Error { message: String },
}
