//! Domain configs for the rate limiter, circuit breaker, and the
//! refinement pipeline's defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::helpers::env_parsed;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::pipeline::PipelineConfig;
use crate::rate_limiter::RateLimitConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitDomainConfig {
    pub global_per_minute: u32,
    pub user_per_minute: u32,
    pub channel_per_minute: u32,
}

impl RateLimitDomainConfig {
    pub fn from_env() -> Self {
        Self {
            global_per_minute: env_parsed("RETRIEVAL_RATE_LIMIT_GLOBAL_PER_MINUTE", 600),
            user_per_minute: env_parsed("RETRIEVAL_RATE_LIMIT_USER_PER_MINUTE", 60),
            channel_per_minute: env_parsed("RETRIEVAL_RATE_LIMIT_CHANNEL_PER_MINUTE", 120),
        }
    }

    pub fn rate_limiter_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            global_per_minute: self.global_per_minute,
            user_per_minute: self.user_per_minute,
            channel_per_minute: self.channel_per_minute,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerDomainConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl CircuitBreakerDomainConfig {
    pub fn from_env() -> Self {
        Self {
            failure_threshold: env_parsed("RETRIEVAL_CIRCUIT_BREAKER_FAILURE_THRESHOLD", 3),
            cooldown_secs: env_parsed("RETRIEVAL_CIRCUIT_BREAKER_COOLDOWN_SECS", 5 * 60),
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDomainConfig {
    pub max_iterations: usize,
    pub queries_per_iteration: usize,
    pub context_window_minutes: i64,
    pub max_context_messages: usize,
    pub messages_per_query: usize,
}

impl PipelineDomainConfig {
    pub fn from_env() -> Self {
        Self {
            max_iterations: env_parsed("RETRIEVAL_PIPELINE_MAX_ITERATIONS", 3),
            queries_per_iteration: env_parsed("RETRIEVAL_PIPELINE_QUERIES_PER_ITERATION", 3),
            context_window_minutes: env_parsed("RETRIEVAL_PIPELINE_CONTEXT_WINDOW_MINUTES", 30),
            max_context_messages: env_parsed("RETRIEVAL_PIPELINE_MAX_CONTEXT_MESSAGES", 10),
            messages_per_query: env_parsed("RETRIEVAL_PIPELINE_MESSAGES_PER_QUERY", 10),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_iterations: self.max_iterations,
            queries_per_iteration: self.queries_per_iteration,
            context_window_minutes: self.context_window_minutes,
            max_context_messages: self.max_context_messages,
            messages_per_query: self.messages_per_query,
        }
    }
}
