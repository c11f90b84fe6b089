use thiserror::Error;

/// Errors surfaced by any adapter, the fusion engine, or an orchestrator run.
///
/// Variants map directly onto the error kinds every surface (MCP, CLI,
/// ops-bot) is expected to translate into its own wire representation —
/// none of them should leak past a surface boundary as-is.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("authentication required: {auth_url}")]
    AuthenticationRequired { auth_url: String },

    #[error("rate limited ({scope})")]
    RateLimited { scope: &'static str },

    #[error("circuit open for {adapter}, retry after cooldown")]
    CircuitOpen { adapter: &'static str },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("search unavailable: both bm25 and vector backends failed")]
    SearchUnavailable,

    #[error("query planning failed: {0}")]
    PlanningFailed(String),

    #[error("response composition failed: {0}")]
    CompositionFailed(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

impl RetrievalError {
    /// A culture-neutral message safe to show a caller; technical detail
    /// belongs in the logs, not in this string.
    pub fn to_user_string(&self) -> String {
        match self {
            RetrievalError::InvalidInput(_) => "That request wasn't valid.".to_string(),
            RetrievalError::AuthenticationRequired { auth_url } => {
                format!("Please authenticate first: {auth_url}")
            }
            RetrievalError::RateLimited { .. } => {
                "Too many requests right now, please try again shortly.".to_string()
            }
            RetrievalError::CircuitOpen { .. } => {
                "A backend is temporarily unavailable, please try again shortly.".to_string()
            }
            RetrievalError::UpstreamUnavailable(_) => {
                "A backend is temporarily unavailable.".to_string()
            }
            RetrievalError::Timeout(_) => "The request took too long.".to_string(),
            RetrievalError::SearchUnavailable => {
                "Search is temporarily unavailable.".to_string()
            }
            RetrievalError::PlanningFailed(_) => {
                "Couldn't work out how to search for that.".to_string()
            }
            RetrievalError::CompositionFailed(_) => {
                "Found results but couldn't compose a response.".to_string()
            }
            RetrievalError::Http(_) | RetrievalError::Json(_) | RetrievalError::Other(_) => {
                "Something went wrong.".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::UpstreamUnavailable(_)
                | RetrievalError::Timeout(_)
                | RetrievalError::Http(_)
        )
    }
}

impl From<String> for RetrievalError {
    fn from(s: String) -> Self {
        RetrievalError::Other(s)
    }
}

impl From<RetrievalError> for String {
    fn from(e: RetrievalError) -> Self {
        e.to_string()
    }
}
