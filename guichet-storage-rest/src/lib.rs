//! Attempt log repository over a hosted PostgREST-style API.
//!
//! The backing store is a managed service exposing table access over HTTP
//! with per-request credentials. Three credential contexts exist, matching
//! the three constructors:
//!
//! - [`RestAttemptLogStore::anonymous`]: the public API key, subject to the
//!   store's row-level access control.
//! - [`RestAttemptLogStore::with_bearer`]: a signed-in user's access token.
//! - [`RestAttemptLogStore::elevated`]: the service-level key that bypasses
//!   row-level access control, used only as the attempt logger's fallback
//!   write path.
//!
//! A row-level denial comes back as an error body with code `42501` and is
//! mapped to [`StorageError::AccessDenied`] so the core can tell it apart
//! from generic failures.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use guichet_core::{AttemptLogRepository, AttemptRecord, Error, NewAttemptRecord, StorageError};
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use url::Url;

/// Error code the store uses for row-level access-control denial.
const ACCESS_DENIED_CODE: &str = "42501";

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub base_url: Url,
    /// Public API key, sent as the `apikey` header on every request.
    pub api_key: String,
    /// Table holding attempt records.
    pub table: String,
}

impl RestStoreConfig {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            table: "auth_attempts".to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

/// [`AttemptLogRepository`] implementation talking to the hosted store.
pub struct RestAttemptLogStore {
    http: Client,
    config: RestStoreConfig,
    bearer: String,
}

impl RestAttemptLogStore {
    /// Store handle using the public API key only.
    pub fn anonymous(config: RestStoreConfig) -> Self {
        let bearer = config.api_key.clone();
        Self {
            http: Client::new(),
            config,
            bearer,
        }
    }

    /// Store handle bound to a signed-in user's access token.
    pub fn with_bearer(config: RestStoreConfig, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            config,
            bearer: access_token.into(),
        }
    }

    /// Store handle using the service-level key that bypasses row-level
    /// access control.
    pub fn elevated(config: RestStoreConfig, service_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            config,
            bearer: service_key.into(),
        }
    }

    fn endpoint(&self) -> Result<Url, Error> {
        self.config
            .base_url
            .join(&format!("rest/v1/{}", self.config.table))
            .map_err(|e| StorageError::Connection(e.to_string()).into())
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.bearer)
    }
}

#[async_trait]
impl AttemptLogRepository for RestAttemptLogStore {
    async fn insert_attempt(&self, record: &NewAttemptRecord) -> Result<AttemptRecord, Error> {
        let response = self
            .request(self.http.post(self.endpoint()?))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await
            .map_err(connection_error)?;
        let response = check_status(response).await?;

        let mut rows: Vec<AttemptRecord> = response.json().await.map_err(connection_error)?;
        rows.pop().ok_or_else(|| {
            StorageError::Database("insert returned no representation".to_string()).into()
        })
    }

    async fn count_failed_since(&self, email: &str, since: DateTime<Utc>) -> Result<u64, Error> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("email", &format!("eq.{email}"))
            .append_pair("status", "eq.failed")
            .append_pair("timestamp", &since_filter(since));

        // Count via the response's content-range total; Range 0-0 keeps the
        // body minimal.
        let response = self
            .request(self.http.get(url))
            .header("Prefer", "count=exact")
            .header(header::RANGE, "0-0")
            .send()
            .await
            .map_err(connection_error)?;
        let response = check_status(response).await?;

        let content_range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        parse_content_range_total(&content_range).ok_or_else(|| {
            StorageError::Database(format!("unparseable content-range: {content_range:?}")).into()
        })
    }

    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<AttemptRecord>, Error> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("timestamp", &since_filter(since))
            .append_pair("order", "timestamp.desc");

        let response = self
            .request(self.http.get(url))
            .send()
            .await
            .map_err(connection_error)?;
        let response = check_status(response).await?;

        response.json().await.map_err(connection_error)
    }
}

/// Render the `gte.` timestamp filter the store expects.
fn since_filter(since: DateTime<Utc>) -> String {
    format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Total from a `content-range` header such as `0-0/42` or `*/0`.
fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.parse().ok()
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    code: Option<String>,
    message: Option<String>,
}

async fn check_status(response: Response) -> Result<Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, body = %body, "store request failed");
    Err(map_error_body(status, &body))
}

fn map_error_body(status: StatusCode, body: &str) -> Error {
    let parsed: Option<StoreErrorBody> = serde_json::from_str(body).ok();
    if let Some(parsed) = &parsed
        && parsed.code.as_deref() == Some(ACCESS_DENIED_CODE)
    {
        return StorageError::AccessDenied.into();
    }

    let message = parsed
        .and_then(|p| p.message)
        .unwrap_or_else(|| body.to_string());
    StorageError::Database(format!("{status}: {message}")).into()
}

fn connection_error(error: reqwest::Error) -> Error {
    StorageError::Connection(error.to_string()).into()
}
