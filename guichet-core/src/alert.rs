//! Alert and analysis result types produced by the log anomaly analyzer.
//!
//! All of these are ephemeral: they are recomputed on every analysis call and
//! never persisted by this subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thresholds for one analysis run.
///
/// Immutable per run; caller-supplied or [`Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Failed attempts from one (identity, IP) pair before a brute-force alert.
    pub failed_attempts: u64,
    /// Trailing window of log records to analyze, in minutes.
    pub time_window_minutes: i64,
    /// Attempts from one IP before a suspicious-IP alert.
    pub ip_attempts: u64,
    /// Attempts against one identity before a suspicious-email alert.
    pub email_attempts: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            failed_attempts: 5,
            time_window_minutes: 15,
            ip_attempts: 3,
            email_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SuspiciousIp,
    SuspiciousEmail,
    BruteForce,
}

/// Alert severity, ordered from [`Severity::Low`] to [`Severity::Critical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One threshold violation found in the analyzed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub count: u64,
    pub severity: Severity,
    /// Set for `suspicious_ip` and `brute_force` alerts with a known origin IP.
    pub ip: Option<String>,
    /// Set for `suspicious_email` and `brute_force` alerts.
    pub email: Option<String>,
}

/// Aggregate statistics over the analyzed window.
///
/// The distinct counts (`unique_ips`, `countries`, `devices`) only consider
/// records where the field is present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_attempts: u64,
    pub failed_attempts: u64,
    pub success_rate: f64,
    pub unique_ips: u64,
    pub countries: u64,
    pub devices: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Return value of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub stats: AnalysisStats,
    /// Ordered by severity rank descending, then count descending.
    pub alerts: Vec<Alert>,
    pub window: AnalysisWindow,
}
