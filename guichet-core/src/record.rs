//! Attempt log data model
//!
//! Every authentication attempt produces structured rows in an append-only
//! log: one `attempt` row when the flow starts, followed by one terminal
//! `success` or `failed` row. The log is the shared source of truth for both
//! the rate limiter and the anomaly analyzer.
//!
//! | Field             | Type               | Description                                      |
//! | ----------------- | ------------------ | ------------------------------------------------ |
//! | `id`              | `i64`              | Row id assigned by the store.                    |
//! | `email`           | `String`           | Normalized identity (lower-cased, trimmed).      |
//! | `status`          | `AttemptStatus`    | `attempt`, `success`, or `failed`.               |
//! | `details`         | `serde_json::Value`| Free-form payload, e.g. the provider message.    |
//! | `error_kind`      | `Option<..>`       | Classified failure category for failed rows.     |
//! | `email_confirmed` | `Option<bool>`     | Whether the account was verified at attempt time.|
//! | `user_agent`      | `Option<String>`   | Client fingerprint.                              |
//! | `ip_address`      | `Option<String>`   | Origin IP; frequently unset.                     |
//! | `country_code`    | `Option<String>`   | Geo lookup result, when the store provides one.  |
//! | `attempt_count`   | `u32`              | Per-insert counter, always 1.                    |
//! | `timestamp`       | `DateTime<Utc>`    | Creation instant.                                |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of an authentication attempt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Attempt,
    Success,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Attempt => "attempt",
            AttemptStatus::Success => "success",
            AttemptStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure category stored on failed attempt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptErrorKind {
    RateLimited,
    EmailNotConfirmed,
    InvalidCredentials,
    UnknownError,
}

impl AttemptErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptErrorKind::RateLimited => "rate_limited",
            AttemptErrorKind::EmailNotConfirmed => "email_not_confirmed",
            AttemptErrorKind::InvalidCredentials => "invalid_credentials",
            AttemptErrorKind::UnknownError => "unknown_error",
        }
    }
}

/// One row of the authentication attempt log.
///
/// Records are created by the sign-in flow, never updated, and never deleted
/// by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub email: String,
    pub status: AttemptStatus,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub error_kind: Option<AttemptErrorKind>,
    #[serde(default)]
    pub email_confirmed: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default = "default_attempt_count")]
    pub attempt_count: u32,
    pub timestamp: DateTime<Utc>,
}

fn default_attempt_count() -> u32 {
    1
}

/// Insert payload for a new attempt record.
///
/// The caller is expected to pass an already-normalized email; see
/// [`crate::validation::normalize_email`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAttemptRecord {
    pub email: String,
    pub status: AttemptStatus,
    pub details: Value,
    pub error_kind: Option<AttemptErrorKind>,
    pub email_confirmed: Option<bool>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub attempt_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl NewAttemptRecord {
    pub fn new(email: impl Into<String>, status: AttemptStatus) -> Self {
        Self {
            email: email.into(),
            status,
            details: Value::Object(serde_json::Map::new()),
            error_kind: None,
            email_confirmed: None,
            user_agent: None,
            ip_address: None,
            attempt_count: 1,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_error_kind(mut self, error_kind: AttemptErrorKind) -> Self {
        self.error_kind = Some(error_kind);
        self
    }

    pub fn with_email_confirmed(mut self, email_confirmed: bool) -> Self {
        self.email_confirmed = Some(email_confirmed);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AttemptStatus::Attempt).unwrap(),
            "\"attempt\""
        );
        assert_eq!(
            serde_json::to_string(&AttemptStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AttemptErrorKind::EmailNotConfirmed).unwrap(),
            "\"email_not_confirmed\""
        );
        assert_eq!(
            AttemptErrorKind::InvalidCredentials.as_str(),
            "invalid_credentials"
        );
    }

    #[test]
    fn test_new_attempt_record_defaults() {
        let record = NewAttemptRecord::new("a@b.com", AttemptStatus::Attempt);
        assert_eq!(record.email, "a@b.com");
        assert_eq!(record.attempt_count, 1);
        assert_eq!(record.error_kind, None);
        assert_eq!(record.ip_address, None);
        assert_eq!(record.details, json!({}));
    }

    #[test]
    fn test_attempt_record_deserializes_sparse_row() {
        // Rows written before the schema grew optional columns still parse.
        let record: AttemptRecord = serde_json::from_value(json!({
            "id": 7,
            "email": "a@b.com",
            "status": "failed",
            "timestamp": "2026-08-27T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.status, AttemptStatus::Failed);
        assert_eq!(record.attempt_count, 1);
        assert_eq!(record.ip_address, None);
        assert_eq!(record.details, Value::Null);
    }
}
