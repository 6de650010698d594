//! Best-effort attempt logging with an elevated-credential fallback.
//!
//! Logging is telemetry, not a gate: a sign-in must never fail because the
//! attempt log could not be written. [`AttemptLogService::log`] therefore
//! returns a plain `bool` and downgrades every persistence failure to a local
//! `tracing` record.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    Error,
    record::{AttemptErrorKind, AttemptStatus, NewAttemptRecord},
    repositories::AttemptLogRepository,
};

/// Service that persists authentication attempt records.
///
/// Holds two injected store handles: the primary handle (session-bound or
/// anonymous, chosen by the embedding application) and an optional elevated
/// handle whose credential bypasses the store's row-level access control.
/// The elevated handle is used for exactly one purpose: retrying an insert
/// the primary handle was denied.
pub struct AttemptLogService<R: AttemptLogRepository> {
    store: Arc<R>,
    elevated: Option<Arc<R>>,
    user_agent: Option<String>,
}

impl<R: AttemptLogRepository> AttemptLogService<R> {
    pub fn new(store: Arc<R>) -> Self {
        Self {
            store,
            elevated: None,
            user_agent: None,
        }
    }

    /// Configure the elevated fallback store.
    pub fn with_elevated(mut self, elevated: Arc<R>) -> Self {
        self.elevated = Some(elevated);
        self
    }

    /// Client fingerprint recorded on every inserted row.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Persist one attempt record. Never fails.
    ///
    /// Returns `true` when a row was stored, `false` when the record only
    /// reached the local diagnostic log.
    pub async fn log(
        &self,
        email: &str,
        status: AttemptStatus,
        details: Value,
        error_kind: Option<AttemptErrorKind>,
        email_confirmed: Option<bool>,
    ) -> bool {
        let mut record = NewAttemptRecord::new(email, status).with_details(details);
        record.error_kind = error_kind;
        record.email_confirmed = email_confirmed;
        record.user_agent = self.user_agent.clone();

        match self.store.insert_attempt(&record).await {
            Ok(_) => true,
            Err(error) if error.is_access_denied() => self.retry_elevated(&record).await,
            Err(error) => {
                Self::log_locally(&record, &error);
                false
            }
        }
    }

    /// Retry an access-denied insert with the elevated credential.
    async fn retry_elevated(&self, record: &NewAttemptRecord) -> bool {
        let Some(elevated) = &self.elevated else {
            tracing::warn!(
                email = %record.email,
                status = %record.status,
                "attempt log insert denied by row-level access control and no elevated store configured"
            );
            Self::log_locally(record, &crate::StorageError::AccessDenied.into());
            return false;
        };

        tracing::warn!(
            email = %record.email,
            status = %record.status,
            "attempt log insert denied by row-level access control, retrying with elevated store"
        );

        match elevated.insert_attempt(record).await {
            Ok(_) => true,
            Err(error) => {
                tracing::error!(error = %error, "elevated store insert also failed");
                Self::log_locally(record, &error);
                false
            }
        }
    }

    /// The local-only fallback channel when no store accepted the record.
    fn log_locally(record: &NewAttemptRecord, error: &Error) {
        tracing::warn!(
            email = %record.email,
            status = %record.status,
            error_kind = ?record.error_kind,
            error = %error,
            "failed to persist auth attempt, record kept in local log only"
        );
    }
}
