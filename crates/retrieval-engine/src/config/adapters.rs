//! Per-adapter domain configs: index, embedding, chat completion, and
//! chat platform. Each loads independently from its own env-var prefix.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_parsed, require_env};
use crate::adapters::{
    ChatCompletionConfig, ChatPlatformConfig, EmbeddingClientConfig, IndexClientConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub timeout_secs: u64,
    pub default_index: String,
}

impl IndexConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: require_env("RETRIEVAL_INDEX_ENDPOINT"),
            access_key: require_env("RETRIEVAL_INDEX_ACCESS_KEY"),
            secret_key: require_env("RETRIEVAL_INDEX_SECRET_KEY"),
            timeout_secs: env_parsed("RETRIEVAL_INDEX_TIMEOUT_SECS", 10),
            default_index: env_or("RETRIEVAL_INDEX_DEFAULT_INDEX", "documents"),
        }
    }

    pub fn client_config(&self) -> IndexClientConfig {
        IndexClientConfig {
            endpoint: self.endpoint.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: require_env("RETRIEVAL_EMBEDDING_ENDPOINT"),
            api_key: require_env("RETRIEVAL_EMBEDDING_API_KEY"),
            model: env_or("RETRIEVAL_EMBEDDING_MODEL", "amazon.titan-embed-text-v2:0"),
            timeout_secs: env_parsed("RETRIEVAL_EMBEDDING_TIMEOUT_SECS", 10),
        }
    }

    pub fn client_config(&self) -> EmbeddingClientConfig {
        EmbeddingClientConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionDomainConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl ChatCompletionDomainConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: require_env("RETRIEVAL_LLM_ENDPOINT"),
            api_key: require_env("RETRIEVAL_LLM_API_KEY"),
            model: env_or("RETRIEVAL_LLM_MODEL", "claude-3-5-sonnet-20241022"),
            max_tokens: env_parsed("RETRIEVAL_LLM_MAX_TOKENS", 1024),
            temperature: env_parsed("RETRIEVAL_LLM_TEMPERATURE", 0.3),
            timeout_secs: env_parsed("RETRIEVAL_LLM_TIMEOUT_SECS", 30),
        }
    }

    pub fn client_config(&self) -> ChatCompletionConfig {
        ChatCompletionConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPlatformDomainConfig {
    pub endpoint: String,
    pub bot_token: String,
    pub timeout_secs: u64,
}

impl ChatPlatformDomainConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_or("RETRIEVAL_SLACK_ENDPOINT", "https://slack.com/api"),
            bot_token: require_env("RETRIEVAL_SLACK_BOT_TOKEN"),
            timeout_secs: env_parsed("RETRIEVAL_SLACK_TIMEOUT_SECS", 10),
        }
    }

    pub fn client_config(&self) -> ChatPlatformConfig {
        ChatPlatformConfig {
            endpoint: self.endpoint.clone(),
            bot_token: self.bot_token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
