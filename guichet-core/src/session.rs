//! Session established by a successful sign-in.
//!
//! The core does not mint tokens; the identity provider does. This module only
//! carries the provider's access token together with the user payload and
//! renders the cookie that the embedding application sets on the response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderUser;

/// Name of the session cookie set on successful sign-in.
pub const SESSION_COOKIE_NAME: &str = "guichet_access_token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: ProviderUser,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, user: ProviderUser) -> Self {
        Self {
            access_token: access_token.into(),
            user,
            created_at: Utc::now(),
        }
    }

    /// Render the scoped session cookie for the given host.
    ///
    /// `Secure; SameSite=Lax; Path=/` so the token travels to every route of
    /// the host over HTTPS only.
    pub fn cookie(&self, domain: &str) -> String {
        format!(
            "{SESSION_COOKIE_NAME}={}; Secure; SameSite=Lax; Path=/; Domain={domain}",
            self.access_token
        )
    }
}
