//! Confirmation email resending with bounded retries.
//!
//! An adjacent flow to sign-in: when the orchestrator fails with
//! [`crate::AuthError::EmailNotConfirmed`], the caller offers a resend action
//! that lands here. Transient provider failures are retried up to three times
//! with linear backoff; a provider-side rate limit aborts immediately.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    Error,
    error::AuthError,
    provider::IdentityProvider,
    validation::{normalize_email, validate_email},
};

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Service resending account confirmation emails.
pub struct ConfirmationService<P: IdentityProvider> {
    provider: Arc<P>,
    max_retries: u32,
}

impl<P: IdentityProvider> ConfirmationService<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Resend the confirmation email, retrying transient failures.
    ///
    /// Backoff is linear: one second after the first failure, two after the
    /// second, and so on.
    pub async fn resend(&self, email: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            match self.provider.resend_confirmation(&email).await {
                Ok(()) => {
                    tracing::debug!(email = %email, attempt, "confirmation email resent");
                    return Ok(());
                }
                Err(error) if error.status == Some(429) => {
                    tracing::warn!(email = %email, "confirmation resend rate limited by provider");
                    return Err(AuthError::RateLimited.into());
                }
                Err(error) => {
                    tracing::warn!(
                        email = %email,
                        attempt,
                        max_retries = self.max_retries,
                        error = %error,
                        "confirmation resend failed"
                    );
                    last_error = Some(error);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    }
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| crate::ProviderError::new("maximum resend retries reached"));
        Err(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, ProviderSession, ProviderUser};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider whose resend endpoint fails a scripted number of times.
    struct FlakyProvider {
        failures_before_success: Mutex<u32>,
        error: ProviderError,
        calls: Mutex<u32>,
    }

    impl FlakyProvider {
        fn failing_n_times(n: u32, error: ProviderError) -> Self {
            Self {
                failures_before_success: Mutex::new(n),
                error,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl IdentityProvider for FlakyProvider {
        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<ProviderSession, ProviderError> {
            unimplemented!()
        }

        async fn current_user(&self) -> Result<Option<ProviderUser>, ProviderError> {
            Ok(None)
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn send_password_reset(&self, _email: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn resend_confirmation(&self, _email: &str) -> Result<(), ProviderError> {
            *self.calls.lock().unwrap() += 1;
            let mut remaining = self.failures_before_success.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(self.error.clone());
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_succeeds_first_try() {
        let provider = Arc::new(FlakyProvider::failing_n_times(0, ProviderError::new("x")));
        let service = ConfirmationService::new(provider.clone());

        service.resend("a@b.com").await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_retries_transient_failures() {
        let provider = Arc::new(FlakyProvider::failing_n_times(
            2,
            ProviderError::with_status(500, "upstream error"),
        ));
        let service = ConfirmationService::new(provider.clone());

        service.resend("a@b.com").await.unwrap();
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_gives_up_after_max_retries() {
        let provider = Arc::new(FlakyProvider::failing_n_times(
            10,
            ProviderError::with_status(500, "upstream error"),
        ));
        let service = ConfirmationService::new(provider.clone());

        let result = service.resend("a@b.com").await;
        assert!(matches!(result, Err(Error::Provider(_))));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_aborts_on_provider_rate_limit() {
        let provider = Arc::new(FlakyProvider::failing_n_times(
            10,
            ProviderError::with_status(429, "Too Many Requests"),
        ));
        let service = ConfirmationService::new(provider.clone());

        let result = service.resend("a@b.com").await;
        assert!(matches!(result, Err(Error::Auth(AuthError::RateLimited))));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_resend_rejects_invalid_email_without_calling_provider() {
        let provider = Arc::new(FlakyProvider::failing_n_times(0, ProviderError::new("x")));
        let service = ConfirmationService::new(provider.clone());

        let result = service.resend("not-an-email").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(provider.calls(), 0);
    }
}
