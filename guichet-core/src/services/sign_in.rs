//! Sign-in orchestration.
//!
//! One linear flow per call: normalize, rate-limit check, attempt log,
//! provider call, outcome classification, terminal log, session
//! establishment. Every invocation writes exactly one terminal record
//! (`success` or `failed`), preceded by one `attempt` record except when the
//! rate limiter rejects before the provider is ever reached.

use std::sync::Arc;

use serde_json::json;

use crate::{
    Error,
    error::AuthError,
    provider::{IdentityProvider, ProviderError, ProviderFailure},
    record::{AttemptErrorKind, AttemptStatus},
    repositories::AttemptLogRepository,
    services::{
        attempt_log::AttemptLogService,
        rate_limit::{RateLimitDecision, RateLimitService},
    },
    session::Session,
    validation::normalize_email,
};

/// Service orchestrating the password sign-in flow.
pub struct SignInService<R: AttemptLogRepository, P: IdentityProvider> {
    attempts: AttemptLogService<R>,
    rate_limiter: RateLimitService<R>,
    provider: Arc<P>,
}

impl<R: AttemptLogRepository, P: IdentityProvider> SignInService<R, P> {
    pub fn new(
        attempts: AttemptLogService<R>,
        rate_limiter: RateLimitService<R>,
        provider: Arc<P>,
    ) -> Self {
        Self {
            attempts,
            rate_limiter,
            provider,
        }
    }

    /// Authenticate with email and password.
    ///
    /// On success the provider's access token and user payload are returned
    /// as a [`Session`]; the caller persists `session.cookie(domain)` on its
    /// response. All failures are typed [`AuthError`] values that have
    /// already been written to the attempt log; none are retried here.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let email = normalize_email(email);
        let password = password.trim();

        if let RateLimitDecision::Rejected { failed_attempts } =
            self.rate_limiter.check(&email).await?
        {
            tracing::warn!(
                email = %email,
                failed_attempts,
                "sign-in rejected by rate limiter"
            );
            self.attempts
                .log(
                    &email,
                    AttemptStatus::Failed,
                    json!({ "error": "Too many failed attempts" }),
                    Some(AttemptErrorKind::RateLimited),
                    None,
                )
                .await;
            return Err(AuthError::RateLimited.into());
        }

        // Best-effort telemetry; an unlogged attempt does not block sign-in.
        self.attempts
            .log(&email, AttemptStatus::Attempt, json!({}), None, None)
            .await;

        let provider_session = match self.provider.sign_in_with_password(&email, password).await {
            Ok(session) => session,
            Err(error) => return Err(self.classify_failure(&email, error).await),
        };

        self.attempts
            .log(&email, AttemptStatus::Success, json!({}), None, None)
            .await;

        let Some(user) = provider_session.user else {
            tracing::error!(email = %email, "provider returned a session without user data");
            return Err(AuthError::NoUserData.into());
        };

        tracing::debug!(email = %email, user_id = %user.id, "sign-in succeeded");
        Ok(Session::new(provider_session.access_token, user))
    }

    /// Log the terminal failed record and map a provider error to its typed
    /// outcome.
    async fn classify_failure(&self, email: &str, error: ProviderError) -> Error {
        match ProviderFailure::classify(&error) {
            ProviderFailure::EmailNotConfirmed => {
                // The provider occasionally reports an unconfirmed email for an
                // account that is in fact confirmed; re-fetch before deciding
                // which failure the caller sees.
                let user = self.provider.current_user().await.ok().flatten();
                if user.as_ref().is_some_and(|u| u.is_confirmed()) {
                    self.attempts
                        .log(
                            email,
                            AttemptStatus::Failed,
                            json!({ "error": "Invalid credentials (email confirmed)" }),
                            Some(AttemptErrorKind::InvalidCredentials),
                            Some(true),
                        )
                        .await;
                    AuthError::InvalidCredentials.into()
                } else {
                    self.attempts
                        .log(
                            email,
                            AttemptStatus::Failed,
                            json!({ "error": "Email not confirmed" }),
                            Some(AttemptErrorKind::EmailNotConfirmed),
                            Some(false),
                        )
                        .await;
                    AuthError::EmailNotConfirmed.into()
                }
            }
            ProviderFailure::InvalidCredentials => {
                self.attempts
                    .log(
                        email,
                        AttemptStatus::Failed,
                        json!({ "error": "Invalid credentials" }),
                        Some(AttemptErrorKind::InvalidCredentials),
                        Some(false),
                    )
                    .await;
                AuthError::InvalidCredentials.into()
            }
            ProviderFailure::RateLimited => {
                self.attempts
                    .log(
                        email,
                        AttemptStatus::Failed,
                        json!({ "error": "Rate limited" }),
                        Some(AttemptErrorKind::RateLimited),
                        Some(false),
                    )
                    .await;
                AuthError::RateLimited.into()
            }
            ProviderFailure::Other(message) => {
                tracing::error!(email = %email, error = %message, "unclassified provider error");
                self.attempts
                    .log(
                        email,
                        AttemptStatus::Failed,
                        json!({ "error": message }),
                        Some(AttemptErrorKind::UnknownError),
                        Some(false),
                    )
                    .await;
                AuthError::UnknownError(message).into()
            }
        }
    }
}
