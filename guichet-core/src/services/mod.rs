//! Service layer for business logic
//!
//! This module contains the services that make up the authentication attempt
//! pipeline: best-effort attempt logging, the pre-flight rate limiter, the
//! sign-in orchestrator, the auth-log anomaly analyzer, and the
//! confirmation-resend flow.

pub mod analysis;
pub mod attempt_log;
pub mod confirmation;
pub mod rate_limit;
pub mod sign_in;

pub use analysis::AnalysisService;
pub use attempt_log::AttemptLogService;
pub use confirmation::ConfirmationService;
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitService};
pub use sign_in::SignInService;
