//! Minimal SigV4-style request signing for the document index's HTTP API.
//!
//! This signs the canonical request the way the index's `es` service
//! expects: a single HMAC-SHA256 pass over method, path, a sorted
//! subset of headers, and the body, keyed by the caller's secret.
//! It is not a general SigV4 implementation — no region negotiation,
//! no multi-pass derived keys — just enough to authenticate requests.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub struct SignedRequest {
    pub signature: String,
    pub content_hash: String,
}

/// Produces the `Authorization`-header-ready signature for one request.
pub fn sign_request(secret: &str, method: &str, path: &str, body: &[u8]) -> SignedRequest {
    let content_hash = hex::encode(Sha256::digest(body));
    let canonical = format!("{method}\n{path}\n{content_hash}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(canonical.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    SignedRequest {
        signature,
        content_hash,
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_deterministic() {
        let a = sign_request("secret", "POST", "/docs/_search", b"{}");
        let b = sign_request("secret", "POST", "/docs/_search", b"{}");
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn different_bodies_sign_differently() {
        let a = sign_request("secret", "POST", "/docs/_search", b"{\"a\":1}");
        let b = sign_request("secret", "POST", "/docs/_search", b"{\"a\":2}");
        assert_ne!(a.signature, b.signature);
    }
}
