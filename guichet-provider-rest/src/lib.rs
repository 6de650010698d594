//! Identity provider client over the hosted auth service's REST API.
//!
//! Wraps the provider's password-grant, user, sign-up, recovery, and resend
//! endpoints. Upstream error messages are carried verbatim into
//! [`ProviderError`]: the core's outcome classifier depends on the provider's
//! message text, so nothing is rewritten here.

use async_trait::async_trait;
use guichet_core::{IdentityProvider, ProviderError, ProviderSession, ProviderUser};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Connection settings for the hosted identity service.
#[derive(Debug, Clone)]
pub struct RestProviderConfig {
    pub base_url: Url,
    /// Public API key, sent as the `apikey` header on every request.
    pub api_key: String,
}

impl RestProviderConfig {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }
}

/// [`IdentityProvider`] implementation talking to the hosted service.
pub struct RestIdentityProvider {
    http: Client,
    config: RestProviderConfig,
    /// Access token of an established session, when one exists. Used by
    /// `current_user`; absent on a fresh client.
    bearer: Option<String>,
}

impl RestIdentityProvider {
    pub fn new(config: RestProviderConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            bearer: None,
        }
    }

    /// Client bound to an existing session's access token.
    pub fn with_bearer(config: RestProviderConfig, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            config,
            bearer: Some(access_token.into()),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| ProviderError::new(e.to_string()))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.config.api_key);
        match &self.bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder.bearer_auth(&self.config.api_key),
        }
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<Response, ProviderError> {
        let response = self
            .request(self.http.post(self.endpoint(path)?))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let response = self
            .post_json(
                "auth/v1/token?grant_type=password",
                json!({ "email": email, "password": password }),
            )
            .await?;

        response.json().await.map_err(transport_error)
    }

    async fn current_user(&self) -> Result<Option<ProviderUser>, ProviderError> {
        if self.bearer.is_none() {
            return Ok(None);
        }

        let response = self
            .request(self.http.get(self.endpoint("auth/v1/user")?))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let response = check_status(response).await?;

        let user: ProviderUser = response.json().await.map_err(transport_error)?;
        Ok(Some(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        self.post_json("auth/v1/signup", json!({ "email": email, "password": password }))
            .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        self.post_json("auth/v1/recover", json!({ "email": email }))
            .await?;
        Ok(())
    }

    async fn resend_confirmation(&self, email: &str) -> Result<(), ProviderError> {
        self.post_json("auth/v1/resend", json!({ "email": email, "type": "signup" }))
            .await?;
        Ok(())
    }
}

/// Error body shapes the provider is known to emit.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

async fn check_status(response: Response) -> Result<Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status, body = %body, "provider request failed");
    Err(ProviderError::with_status(
        status,
        extract_error_message(&body),
    ))
}

/// Pull the human-readable message out of a provider error body.
///
/// The service emits either `error_description` (token endpoint), `msg`
/// (other endpoints), or `error`; unparseable bodies pass through raw.
fn extract_error_message(body: &str) -> String {
    let parsed: Option<ProviderErrorBody> = serde_json::from_str(body).ok();
    match parsed {
        Some(parsed) => parsed
            .error_description
            .or(parsed.msg)
            .or(parsed.error)
            .unwrap_or_else(|| body.to_string()),
        None => body.to_string(),
    }
}

fn transport_error(error: reqwest::Error) -> ProviderError {
    ProviderError::new(error.to_string())
}
