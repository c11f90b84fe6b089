//! AuthGate and server-surface configuration.

use serde::{Deserialize, Serialize};

use super::helpers::{env_list, env_or, env_parsed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Ip,
    Oidc,
    Both,
    Either,
}

impl AuthMode {
    fn from_str_or_default(raw: &str) -> Self {
        match raw {
            "ip" => AuthMode::Ip,
            "oidc" => AuthMode::Oidc,
            "both" => AuthMode::Both,
            "either" => AuthMode::Either,
            _ => AuthMode::Ip,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub allow_cidrs: Vec<String>,
    pub bypass_cidrs: Vec<String>,
    pub trusted_proxies: Vec<String>,
    pub oidc_issuer: String,
    pub oidc_audience: String,
    pub oidc_jwks_url: String,
    pub oidc_authorize_url: String,
    pub oidc_client_id: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            mode: AuthMode::from_str_or_default(&env_or("RETRIEVAL_AUTH_MODE", "ip")),
            allow_cidrs: env_list("RETRIEVAL_AUTH_ALLOW_CIDRS"),
            bypass_cidrs: env_list("RETRIEVAL_AUTH_BYPASS_CIDRS"),
            trusted_proxies: env_list("RETRIEVAL_AUTH_TRUSTED_PROXIES"),
            oidc_issuer: env_or("RETRIEVAL_AUTH_OIDC_ISSUER", ""),
            oidc_audience: env_or("RETRIEVAL_AUTH_OIDC_AUDIENCE", ""),
            oidc_jwks_url: env_or("RETRIEVAL_AUTH_OIDC_JWKS_URL", ""),
            oidc_authorize_url: env_or("RETRIEVAL_AUTH_OIDC_AUTHORIZE_URL", ""),
            oidc_client_id: env_or("RETRIEVAL_AUTH_OIDC_CLIENT_ID", ""),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mcp_tool_prefix: String,
    pub log_level: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("RETRIEVAL_SERVER_HOST", "0.0.0.0"),
            port: env_parsed("RETRIEVAL_SERVER_PORT", 8787),
            mcp_tool_prefix: env_or("RETRIEVAL_MCP_TOOL_PREFIX", ""),
            log_level: env_or("RUST_LOG", "info"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
