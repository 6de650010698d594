//! Repository trait for the authentication attempt log.
//!
//! This module defines the storage interface for persisting attempt records
//! and reading them back for rate limiting and anomaly analysis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    record::{AttemptRecord, NewAttemptRecord},
};

/// Repository for the append-only authentication attempt log.
///
/// Implementations should persist every record passed to `insert_attempt`,
/// including records for email addresses that do not belong to any account;
/// recording unknown identities is what makes the analyzer useful against
/// enumeration and spraying attacks.
///
/// # Access control
///
/// A store enforcing row-level access control must surface its denial as
/// [`crate::StorageError::AccessDenied`] so the attempt logger can distinguish
/// it from generic failures and retry with an elevated credential.
#[async_trait]
pub trait AttemptLogRepository: Send + Sync + 'static {
    /// Insert a new attempt record.
    ///
    /// Returns the persisted record with its store-assigned id.
    async fn insert_attempt(&self, record: &NewAttemptRecord) -> Result<AttemptRecord, Error>;

    /// Count failed attempts for a normalized identity since the cutoff.
    ///
    /// Only rows with `status = failed` and the exact identity string are
    /// counted. Used by the rate limiter's pre-flight check.
    async fn count_failed_since(&self, email: &str, since: DateTime<Utc>) -> Result<u64, Error>;

    /// Fetch all records with a timestamp at or after the cutoff.
    ///
    /// Used by the anomaly analyzer; ordering is not relied upon.
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<AttemptRecord>, Error>;
}
