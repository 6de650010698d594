//! Core functionality for the guichet authentication pipeline
//!
//! This crate contains the building blocks of the sign-in flow: the attempt log
//! data model, the repository and identity-provider seams, and the services that
//! sequence rate limiting, attempt logging, provider authentication, and
//! auth-log anomaly analysis.
//!
//! Application code normally consumes these through the `guichet` facade crate
//! and only depends on this crate directly when implementing a storage backend
//! or identity provider.
//!
//! See [`AttemptRecord`] for the log row, [`Session`] for the established
//! session, and [`services`] for the service layer.

pub mod alert;
pub mod error;
pub mod provider;
pub mod record;
pub mod repositories;
pub mod services;
pub mod session;
pub mod validation;

pub use alert::{Alert, AlertKind, AlertThresholds, AnalysisResult, AnalysisStats, Severity};
pub use error::{AuthError, Error, StorageError, ValidationError};
pub use provider::{
    IdentityProvider, ProviderError, ProviderFailure, ProviderSession, ProviderUser,
};
pub use record::{AttemptErrorKind, AttemptRecord, AttemptStatus, NewAttemptRecord};
pub use repositories::AttemptLogRepository;
pub use session::Session;
