//! Composite token-bucket rate limiting: one global bucket plus keyed
//! per-user and per-channel buckets, built on `governor`.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};

/// Per-minute quotas for the three scopes a request is checked against.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub global_per_minute: u32,
    pub user_per_minute: u32,
    pub channel_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: 600,
            user_per_minute: 60,
            channel_per_minute: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    Global,
    User,
    Channel,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Global => "global",
            RateLimitScope::User => "user",
            RateLimitScope::Channel => "channel",
        }
    }
}

/// Gates inbound requests before they reach the engine. Buckets are
/// checked global-first: a keyed bucket is only consulted once the
/// scope above it has already allowed the request, so a user who would
/// have been refused never debits the channel or global buckets behind
/// them. Key spaces (user ids, channel ids) are caller-bounded — this
/// limiter does not evict entries.
pub struct RateLimiter {
    global: Arc<GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    per_user: Arc<GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>,
    per_channel: Arc<GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let quota = |per_minute: u32| {
            Quota::per_minute(NonZeroU32::new(per_minute.max(1)).expect("nonzero"))
        };
        Self {
            global: Arc::new(GovRateLimiter::direct(quota(config.global_per_minute))),
            per_user: Arc::new(GovRateLimiter::keyed(quota(config.user_per_minute))),
            per_channel: Arc::new(GovRateLimiter::keyed(quota(config.channel_per_minute))),
        }
    }

    /// Checks and consumes one token from each scope, in order. Returns
    /// the first scope that refused, if any. A refusal at a given scope
    /// never consumes from the scopes after it, since they aren't reached.
    pub fn allow(&self, user_id: &str, channel_id: &str) -> Result<(), RateLimitScope> {
        if self.global.check().is_err() {
            return Err(RateLimitScope::Global);
        }
        if !user_id.is_empty() && self.per_user.check_key(&user_id.to_string()).is_err() {
            return Err(RateLimitScope::User);
        }
        if !channel_id.is_empty() && self.per_channel.check_key(&channel_id.to_string()).is_err() {
            return Err(RateLimitScope::Channel);
        }
        Ok(())
    }

    /// Global-only check, used by adapters that have no user/channel
    /// context (e.g. the index client).
    pub fn try_acquire_global(&self) -> bool {
        self.global.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_bucket_exhausts_before_keyed_buckets_are_touched() {
        let limiter = RateLimiter::new(RateLimitConfig {
            global_per_minute: 1,
            user_per_minute: 60,
            channel_per_minute: 60,
        });
        assert!(limiter.allow("u1", "c1").is_ok());
        assert_eq!(limiter.allow("u1", "c1"), Err(RateLimitScope::Global));
    }

    #[test]
    fn user_bucket_is_independent_per_key() {
        let limiter = RateLimiter::new(RateLimitConfig {
            global_per_minute: 1000,
            user_per_minute: 1,
            channel_per_minute: 1000,
        });
        assert!(limiter.allow("u1", "c1").is_ok());
        assert_eq!(limiter.allow("u1", "c1"), Err(RateLimitScope::User));
        assert!(limiter.allow("u2", "c1").is_ok());
    }
}
