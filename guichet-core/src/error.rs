use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Terminal, typed failures of the sign-in call.
///
/// None of these are retried automatically; each maps to exactly one
/// user-facing message. `InvalidCredentials` is reported identically whether
/// the root cause was a wrong password or a wrong but confirmed email, so the
/// API never leaks account existence.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Too many failed attempts")]
    RateLimited,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("Technical error during sign-in: {0}")]
    UnknownError(String),

    #[error("No user data returned")]
    NoUserData,
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The store's row-level access control rejected the operation.
    ///
    /// Distinguishable from generic database errors so the attempt logger can
    /// retry the insert with an elevated credential.
    #[error("Row-level access control denied the operation")]
    AccessDenied,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Whether this error is the store's row-level access-control denial.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::Storage(StorageError::AccessDenied))
    }
}
