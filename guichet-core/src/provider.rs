//! Identity provider seam
//!
//! The sign-in orchestrator never talks to the hosted identity service
//! directly; it goes through [`IdentityProvider`]. The provider communicates
//! failures as a [`ProviderError`] carrying the upstream message text, and
//! [`ProviderFailure::classify`] is the single place that interprets that
//! text. The message substrings matched there ("Email not confirmed",
//! "Invalid login credentials", "rate_limited") are the de facto protocol
//! contract with the hosted service; if its wording changes, only the
//! classifier needs to follow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by an identity provider call.
///
/// Carries the upstream message verbatim because outcome classification
/// depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status of the upstream response, when the failure had one.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// User payload returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl ProviderUser {
    /// Whether the account's email has been verified.
    ///
    /// The provider has historically reported confirmation under either
    /// field, so both are checked.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some() || self.email_confirmed_at.is_some()
    }
}

/// Session payload returned by a successful password sign-in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<ProviderUser>,
}

/// The hosted identity service consumed by the sign-in flow.
///
/// Implementations wrap the provider's password sign-in, sign-up, recovery,
/// and confirmation endpoints. All methods suspend on network I/O.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Authenticate with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError>;

    /// Fetch the user bound to the provider client's current credentials.
    ///
    /// Returns `None` when no user is associated. Used to double-check the
    /// confirmation state when the provider reports an unconfirmed email.
    async fn current_user(&self) -> Result<Option<ProviderUser>, ProviderError>;

    /// Register a new account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    /// Send a password recovery email.
    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    /// Resend the account confirmation email.
    async fn resend_confirmation(&self, email: &str) -> Result<(), ProviderError>;
}

/// Classified provider failure.
///
/// Tagged variant form of the provider's message-matching protocol, so the
/// orchestrator branches on a type instead of on strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    EmailNotConfirmed,
    InvalidCredentials,
    RateLimited,
    Other(String),
}

impl ProviderFailure {
    /// Classify a provider error by its message text and status.
    pub fn classify(error: &ProviderError) -> Self {
        if error.message.contains("Email not confirmed") {
            ProviderFailure::EmailNotConfirmed
        } else if error.message.contains("Invalid login credentials") {
            ProviderFailure::InvalidCredentials
        } else if error.message.contains("rate_limited") || error.status == Some(429) {
            ProviderFailure::RateLimited
        } else {
            ProviderFailure::Other(error.message.clone())
        }
    }

    /// The error kind recorded on the failed attempt log row.
    pub fn error_kind(&self) -> crate::record::AttemptErrorKind {
        use crate::record::AttemptErrorKind;
        match self {
            ProviderFailure::EmailNotConfirmed => AttemptErrorKind::EmailNotConfirmed,
            ProviderFailure::InvalidCredentials => AttemptErrorKind::InvalidCredentials,
            ProviderFailure::RateLimited => AttemptErrorKind::RateLimited,
            ProviderFailure::Other(_) => AttemptErrorKind::UnknownError,
        }
    }
}
