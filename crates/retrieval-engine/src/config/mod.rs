//! Layered, environment-driven configuration. One sub-config struct per
//! domain (index, embedding, chat completion, chat platform, rate
//! limiting, circuit breaking, pipeline defaults, auth, server),
//! composed into one top-level [`AppConfig`] — this codebase's
//! domain-config-composition convention (cf. `MiraConfig`).

mod adapters;
mod auth;
mod helpers;
mod policy;

pub use adapters::{ChatCompletionDomainConfig, ChatPlatformDomainConfig, EmbeddingConfig, IndexConfig};
pub use auth::{AuthConfig, AuthMode, ServerConfig};
pub use policy::{CircuitBreakerDomainConfig, PipelineDomainConfig, RateLimitDomainConfig};

/// Process-wide, immutable once loaded. Every binary calls
/// [`AppConfig::from_env`] exactly once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub chat_completion: ChatCompletionDomainConfig,
    pub chat_platform: ChatPlatformDomainConfig,
    pub rate_limit: RateLimitDomainConfig,
    pub circuit_breaker: CircuitBreakerDomainConfig,
    pub pipeline: PipelineDomainConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Loads every domain config from the environment, picking up a
    /// `.env` file in the working directory if present. Panics on a
    /// missing required credential — configuration errors should surface
    /// at startup, not mid-request.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            index: IndexConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            chat_completion: ChatCompletionDomainConfig::from_env(),
            chat_platform: ChatPlatformDomainConfig::from_env(),
            rate_limit: RateLimitDomainConfig::from_env(),
            circuit_breaker: CircuitBreakerDomainConfig::from_env(),
            pipeline: PipelineDomainConfig::from_env(),
            auth: AuthConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }
}
