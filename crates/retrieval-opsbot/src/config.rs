//! Ops-bot-specific environment configuration, following this
//! codebase's flat free-function env-loading convention (cf.
//! `retrieval_engine::config`).

use std::env;
use std::str::FromStr;

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn require_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("missing required env var: {key}"))
}

#[derive(Debug, Clone)]
pub struct OpsBotConfig {
    /// Persistent socket endpoint the bot connects to for inbound events.
    pub gateway_url: String,
    /// This bot's own user id, used to recognize `@mention` events
    /// addressed to it versus chatter about someone else.
    pub bot_user_id: String,
    pub top_k: usize,
    pub reconnect_max_attempts: u32,
}

impl OpsBotConfig {
    pub fn from_env() -> Self {
        Self {
            gateway_url: require_env("RETRIEVAL_OPSBOT_GATEWAY_URL"),
            bot_user_id: require_env("RETRIEVAL_OPSBOT_BOT_USER_ID"),
            top_k: env_parsed("RETRIEVAL_OPSBOT_TOP_K", 10),
            reconnect_max_attempts: env_parsed("RETRIEVAL_OPSBOT_RECONNECT_MAX_ATTEMPTS", 10),
        }
    }
}
