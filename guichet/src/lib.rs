//! # Guichet
//!
//! Guichet is the authentication core of a marketplace application built over
//! a hosted identity and data service. It owns the pieces of sign-in that
//! deserve real design: the pre-flight rate limiter, the best-effort attempt
//! log with an elevated-credential fallback, the outcome classification of
//! provider failures, and the auth-log anomaly analyzer behind the operator
//! dashboard.
//!
//! Page rendering, forms, and the marketplace domain model are consumers of
//! this crate, not part of it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use guichet::Guichet;
//! use guichet_provider_rest::{RestIdentityProvider, RestProviderConfig};
//! use guichet_storage_rest::{RestAttemptLogStore, RestStoreConfig};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = Url::parse("https://backend.example.com")?;
//!     let store = Arc::new(RestAttemptLogStore::anonymous(
//!         RestStoreConfig::new(base.clone(), "anon-key"),
//!     ));
//!     let provider = Arc::new(RestIdentityProvider::new(
//!         RestProviderConfig::new(base, "anon-key"),
//!     ));
//!
//!     let guichet = Guichet::new(store, provider);
//!     let session = guichet.sign_in("user@example.com", "password").await?;
//!     println!("cookie: {}", session.cookie("example.com"));
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use guichet_core::{
    services::{
        AnalysisService, AttemptLogService, ConfirmationService, RateLimitConfig,
        RateLimitDecision, RateLimitService, SignInService,
    },
    validation::{normalize_email, validate_email},
};

/// Re-export core types commonly used when working with the Guichet API.
pub use guichet_core::{
    Alert, AlertKind, AlertThresholds, AnalysisResult, AnalysisStats, AttemptErrorKind,
    AttemptLogRepository, AttemptRecord, AttemptStatus, AuthError, Error, IdentityProvider,
    NewAttemptRecord, ProviderError, ProviderSession, ProviderUser, Session, Severity,
    StorageError,
};
pub use guichet_core::{services, session::SESSION_COOKIE_NAME};

/// The authentication coordinator wiring injected backend handles into the
/// sign-in pipeline.
///
/// Both handles are explicitly constructed and injected, never global: tests
/// substitute in-memory implementations, and the embedding application decides
/// whether the store handle is anonymous or bound to the current session.
pub struct Guichet<R: AttemptLogRepository, P: IdentityProvider> {
    store: Arc<R>,
    elevated_store: Option<Arc<R>>,
    provider: Arc<P>,
    user_agent: Option<String>,
    rate_limit_config: RateLimitConfig,
}

impl<R: AttemptLogRepository, P: IdentityProvider> Guichet<R, P> {
    pub fn new(store: Arc<R>, provider: Arc<P>) -> Self {
        Self {
            store,
            elevated_store: None,
            provider,
            user_agent: None,
            rate_limit_config: RateLimitConfig::default(),
        }
    }

    /// Configure the elevated store handle used as the attempt logger's
    /// fallback write path when the primary handle is denied by row-level
    /// access control.
    pub fn with_elevated_store(mut self, elevated: Arc<R>) -> Self {
        self.elevated_store = Some(elevated);
        self
    }

    /// Client fingerprint recorded on attempt log rows.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Authenticate with email and password.
    ///
    /// Runs the full pipeline: rate-limit check, attempt log, provider call,
    /// outcome classification, terminal log, session establishment. See
    /// [`guichet_core::services::SignInService::sign_in`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        SignInService::new(
            self.attempt_logger(),
            self.rate_limiter(),
            self.provider.clone(),
        )
        .sign_in(email, password)
        .await
    }

    /// Register a new account with the identity provider.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        validate_email(&email)?;
        self.provider.sign_up(&email, password.trim()).await?;
        Ok(())
    }

    /// Send a password recovery email.
    pub async fn reset_password(&self, email: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        validate_email(&email)?;
        self.provider.send_password_reset(&email).await?;
        Ok(())
    }

    /// Resend the account confirmation email, retrying transient failures.
    pub async fn resend_confirmation(&self, email: &str) -> Result<(), Error> {
        ConfirmationService::new(self.provider.clone())
            .resend(email)
            .await
    }

    /// Check the pre-flight rate limit for an identity without signing in.
    pub async fn check_rate_limit(&self, email: &str) -> Result<RateLimitDecision, Error> {
        let email = normalize_email(email);
        self.rate_limiter().check(&email).await
    }

    /// Analyze the attempt log for suspicious patterns.
    ///
    /// Invoked by the operator dashboard; read-only and idempotent.
    pub async fn analyze_logs(
        &self,
        thresholds: Option<AlertThresholds>,
    ) -> Result<AnalysisResult, Error> {
        AnalysisService::new(self.store.clone())
            .analyze(&thresholds.unwrap_or_default())
            .await
    }

    fn attempt_logger(&self) -> AttemptLogService<R> {
        let mut logger = AttemptLogService::new(self.store.clone());
        if let Some(elevated) = &self.elevated_store {
            logger = logger.with_elevated(elevated.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            logger = logger.with_user_agent(user_agent.clone());
        }
        logger
    }

    fn rate_limiter(&self) -> RateLimitService<R> {
        RateLimitService::new(self.store.clone()).with_config(self.rate_limit_config.clone())
    }
}
