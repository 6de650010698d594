//! Pre-flight rate limiting over the attempt log.
//!
//! The check is count-based and reads the persistent log fresh on every call;
//! there is no in-process state, so concurrent attempts can race past it. That
//! is accepted: the limiter is a brake on sustained guessing, not a lock.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{Error, repositories::AttemptLogRepository};

/// Configuration for the pre-flight rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Failed attempts within the window before sign-ins are rejected.
    pub max_failed_attempts: u64,
    /// Trailing window the failed attempts are counted over.
    pub window: Duration,
    /// When the count query itself fails, allow the attempt instead of
    /// blocking it. Availability over strict enforcement.
    pub fail_open: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            window: Duration::hours(1),
            fail_open: true,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Rejected { failed_attempts: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// Service checking recent failed attempts before a sign-in proceeds.
pub struct RateLimitService<R: AttemptLogRepository> {
    store: Arc<R>,
    config: RateLimitConfig,
}

impl<R: AttemptLogRepository> RateLimitService<R> {
    pub fn new(store: Arc<R>) -> Self {
        Self {
            store,
            config: RateLimitConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RateLimitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check whether a sign-in attempt for this identity may proceed.
    ///
    /// Expects an already-normalized email. A failing count query resolves to
    /// [`RateLimitDecision::Allowed`] when `fail_open` is set, otherwise the
    /// storage error propagates.
    pub async fn check(&self, email: &str) -> Result<RateLimitDecision, Error> {
        let since = Utc::now() - self.config.window;

        match self.store.count_failed_since(email, since).await {
            Ok(count) if count >= self.config.max_failed_attempts => {
                Ok(RateLimitDecision::Rejected {
                    failed_attempts: count,
                })
            }
            Ok(_) => Ok(RateLimitDecision::Allowed),
            Err(error) if self.config.fail_open => {
                tracing::warn!(
                    email = %email,
                    error = %error,
                    "rate limit count query failed, allowing attempt"
                );
                Ok(RateLimitDecision::Allowed)
            }
            Err(error) => Err(error),
        }
    }
}
