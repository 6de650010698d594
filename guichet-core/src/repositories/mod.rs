//! Repository traits for data access layer
//!
//! This module defines the repository interfaces that services use to interact
//! with the persistent attempt log. The traits provide a clean abstraction over
//! the underlying store, allowing backends (and tests) to substitute their own
//! implementations.

pub mod attempt_log;

pub use attempt_log::AttemptLogRepository;
