//! The iterative chat-corpus refinement pipeline: PLAN → SEARCH → ENRICH
//! → CHECK, repeating (with accumulated feedback) until a sufficiency
//! check passes or the iteration cap is reached.

mod planner;
mod enrichment;
mod retrieval;

pub use planner::{LlmQueryPlanner, SufficiencyVerdict};
pub use retrieval::{PipelineConfig, SlackRetrievalPipeline};
