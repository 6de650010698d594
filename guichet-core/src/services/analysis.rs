//! Auth-log anomaly analysis.
//!
//! Batch, read-only pass over the attempt log: aggregate statistics plus
//! threshold-based alerts for suspicious IPs, suspicious identities, and
//! combined brute-force patterns. Results are recomputed on every call and
//! never persisted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    Error,
    alert::{
        Alert, AlertKind, AlertThresholds, AnalysisResult, AnalysisStats, AnalysisWindow, Severity,
    },
    record::{AttemptRecord, AttemptStatus},
    repositories::AttemptLogRepository,
};

/// Service computing anomaly reports over the attempt log.
pub struct AnalysisService<R: AttemptLogRepository> {
    store: Arc<R>,
}

impl<R: AttemptLogRepository> AnalysisService<R> {
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    /// Analyze the trailing window defined by the thresholds.
    ///
    /// Idempotent: calling twice over an unchanged log yields identical
    /// results. Records lacking an origin IP are excluded from the per-IP
    /// table; the failed-pair table keeps an unknown-IP bucket so identity
    /// brute force is still visible when clients report no IP.
    pub async fn analyze(&self, thresholds: &AlertThresholds) -> Result<AnalysisResult, Error> {
        let end = Utc::now();
        let start = end - Duration::minutes(thresholds.time_window_minutes);
        let window = AnalysisWindow { start, end };

        let records = self.store.fetch_since(start).await?;
        if records.is_empty() {
            return Ok(AnalysisResult {
                stats: AnalysisStats::default(),
                alerts: Vec::new(),
                window,
            });
        }

        let stats = compute_stats(&records);
        let alerts = compute_alerts(&records, thresholds);

        tracing::debug!(
            total = stats.total_attempts,
            failed = stats.failed_attempts,
            alerts = alerts.len(),
            "auth log analysis complete"
        );

        Ok(AnalysisResult {
            stats,
            alerts,
            window,
        })
    }
}

fn compute_stats(records: &[AttemptRecord]) -> AnalysisStats {
    let total = records.len() as u64;
    let failed = records
        .iter()
        .filter(|r| r.status == AttemptStatus::Failed)
        .count() as u64;
    let successes = records
        .iter()
        .filter(|r| r.status == AttemptStatus::Success)
        .count() as u64;

    let unique_ips: BTreeSet<&str> = records.iter().filter_map(|r| r.ip_address.as_deref()).collect();
    let countries: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.country_code.as_deref())
        .collect();
    let devices: BTreeSet<&str> = records.iter().filter_map(|r| r.user_agent.as_deref()).collect();

    AnalysisStats {
        total_attempts: total,
        failed_attempts: failed,
        success_rate: successes as f64 / total as f64,
        unique_ips: unique_ips.len() as u64,
        countries: countries.len() as u64,
        devices: devices.len() as u64,
    }
}

fn compute_alerts(records: &[AttemptRecord], thresholds: &AlertThresholds) -> Vec<Alert> {
    // BTreeMap keeps alert generation deterministic across runs.
    let mut ip_counts: BTreeMap<&str, u64> = BTreeMap::new();
    let mut email_counts: BTreeMap<&str, u64> = BTreeMap::new();
    let mut pair_counts: BTreeMap<(&str, Option<&str>), u64> = BTreeMap::new();

    for record in records {
        if let Some(ip) = record.ip_address.as_deref() {
            *ip_counts.entry(ip).or_default() += 1;
        }
        *email_counts.entry(&record.email).or_default() += 1;
        if record.status == AttemptStatus::Failed {
            *pair_counts
                .entry((&record.email, record.ip_address.as_deref()))
                .or_default() += 1;
        }
    }

    let mut alerts = Vec::new();

    for (ip, count) in ip_counts {
        if count >= thresholds.ip_attempts {
            alerts.push(Alert {
                kind: AlertKind::SuspiciousIp,
                message: format!("Repeated attempts from IP {ip}"),
                count,
                severity: if count > 10 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                ip: Some(ip.to_string()),
                email: None,
            });
        }
    }

    for (email, count) in email_counts {
        if count >= thresholds.email_attempts {
            alerts.push(Alert {
                kind: AlertKind::SuspiciousEmail,
                message: format!("Repeated attempts against {email}"),
                count,
                severity: if count > 5 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                ip: None,
                email: Some(email.to_string()),
            });
        }
    }

    for ((email, ip), count) in pair_counts {
        if count >= thresholds.failed_attempts {
            alerts.push(Alert {
                kind: AlertKind::BruteForce,
                message: format!("Brute force pattern detected ({count} failed attempts)"),
                count,
                severity: Severity::Critical,
                ip: ip.map(|ip| ip.to_string()),
                email: Some(email.to_string()),
            });
        }
    }

    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.count.cmp(&a.count))
    });
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewAttemptRecord, record::AttemptErrorKind};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    struct MemoryAttemptLog {
        records: Mutex<Vec<AttemptRecord>>,
    }

    impl MemoryAttemptLog {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }

        fn seed(
            &self,
            email: &str,
            status: AttemptStatus,
            ip: Option<&str>,
            user_agent: Option<&str>,
            country: Option<&str>,
        ) {
            let mut records = self.records.lock().unwrap();
            let id = records.len() as i64 + 1;
            records.push(AttemptRecord {
                id,
                email: email.to_string(),
                status,
                details: serde_json::json!({}),
                error_kind: match status {
                    AttemptStatus::Failed => Some(AttemptErrorKind::InvalidCredentials),
                    _ => None,
                },
                email_confirmed: None,
                user_agent: user_agent.map(String::from),
                ip_address: ip.map(String::from),
                country_code: country.map(String::from),
                attempt_count: 1,
                timestamp: Utc::now() - Duration::minutes(5),
            });
        }
    }

    #[async_trait]
    impl AttemptLogRepository for MemoryAttemptLog {
        async fn insert_attempt(
            &self,
            _record: &NewAttemptRecord,
        ) -> Result<AttemptRecord, Error> {
            unimplemented!()
        }

        async fn count_failed_since(
            &self,
            _email: &str,
            _since: DateTime<Utc>,
        ) -> Result<u64, Error> {
            Ok(0)
        }

        async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<AttemptRecord>, Error> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.timestamp >= since)
                .cloned()
                .collect())
        }
    }

    fn thresholds() -> AlertThresholds {
        AlertThresholds {
            failed_attempts: 5,
            time_window_minutes: 60,
            ip_attempts: 3,
            email_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_empty_window_returns_zeroed_result() {
        let log = Arc::new(MemoryAttemptLog::new());
        let service = AnalysisService::new(log);

        let result = service.analyze(&thresholds()).await.unwrap();

        assert_eq!(result.stats, AnalysisStats::default());
        assert!(result.alerts.is_empty());
        assert!(result.window.start < result.window.end);
    }

    #[tokio::test]
    async fn test_stats_aggregation() {
        let log = Arc::new(MemoryAttemptLog::new());
        log.seed("a@b.com", AttemptStatus::Attempt, Some("1.1.1.1"), Some("ua-1"), Some("FR"));
        log.seed("a@b.com", AttemptStatus::Success, Some("1.1.1.1"), Some("ua-1"), Some("FR"));
        log.seed("c@d.com", AttemptStatus::Failed, Some("2.2.2.2"), Some("ua-2"), Some("DE"));
        log.seed("e@f.com", AttemptStatus::Failed, None, None, None);

        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();

        assert_eq!(result.stats.total_attempts, 4);
        assert_eq!(result.stats.failed_attempts, 2);
        assert_eq!(result.stats.success_rate, 0.25);
        // IP-less and field-less records do not create "unknown" buckets.
        assert_eq!(result.stats.unique_ips, 2);
        assert_eq!(result.stats.countries, 2);
        assert_eq!(result.stats.devices, 2);
    }

    #[tokio::test]
    async fn test_suspicious_ip_medium_severity_at_six_attempts() {
        // Six attempts from one IP against a threshold of 3.
        // Six is over the alert threshold but not over the >10 high bar.
        let log = Arc::new(MemoryAttemptLog::new());
        for i in 0..6 {
            log.seed(
                &format!("u{i}@b.com"),
                AttemptStatus::Failed,
                Some("1.2.3.4"),
                None,
                None,
            );
        }

        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();

        let ip_alerts: Vec<_> = result
            .alerts
            .iter()
            .filter(|a| a.kind == AlertKind::SuspiciousIp)
            .collect();
        assert_eq!(ip_alerts.len(), 1);
        assert_eq!(ip_alerts[0].count, 6);
        assert_eq!(ip_alerts[0].severity, Severity::Medium);
        assert_eq!(ip_alerts[0].ip.as_deref(), Some("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_suspicious_ip_high_severity_above_ten() {
        let log = Arc::new(MemoryAttemptLog::new());
        for i in 0..11 {
            log.seed(
                &format!("u{i}@b.com"),
                AttemptStatus::Attempt,
                Some("1.2.3.4"),
                None,
                None,
            );
        }

        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();

        let alert = result
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::SuspiciousIp)
            .unwrap();
        assert_eq!(alert.count, 11);
        assert_eq!(alert.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_suspicious_email_severity_boundary() {
        let log = Arc::new(MemoryAttemptLog::new());
        for _ in 0..5 {
            log.seed("target@b.com", AttemptStatus::Attempt, None, None, None);
        }

        let result = AnalysisService::new(log.clone())
            .analyze(&thresholds())
            .await
            .unwrap();
        let alert = result
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::SuspiciousEmail)
            .unwrap();
        // Exactly 5 is not over the >5 bar.
        assert_eq!(alert.severity, Severity::Medium);

        log.seed("target@b.com", AttemptStatus::Attempt, None, None, None);
        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();
        let alert = result
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::SuspiciousEmail)
            .unwrap();
        assert_eq!(alert.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_brute_force_pair_is_critical_and_failed_only() {
        let log = Arc::new(MemoryAttemptLog::new());
        for _ in 0..5 {
            log.seed("a@b.com", AttemptStatus::Failed, Some("9.9.9.9"), None, None);
        }
        // Successful attempts from the same pair do not count toward it.
        for _ in 0..5 {
            log.seed("a@b.com", AttemptStatus::Success, Some("9.9.9.9"), None, None);
        }

        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();

        let brute: Vec<_> = result
            .alerts
            .iter()
            .filter(|a| a.kind == AlertKind::BruteForce)
            .collect();
        assert_eq!(brute.len(), 1);
        assert_eq!(brute[0].count, 5);
        assert_eq!(brute[0].severity, Severity::Critical);
        assert_eq!(brute[0].email.as_deref(), Some("a@b.com"));
        assert_eq!(brute[0].ip.as_deref(), Some("9.9.9.9"));
    }

    #[tokio::test]
    async fn test_brute_force_keeps_unknown_ip_bucket() {
        let log = Arc::new(MemoryAttemptLog::new());
        for _ in 0..5 {
            log.seed("a@b.com", AttemptStatus::Failed, None, None, None);
        }

        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();

        let brute = result
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::BruteForce)
            .unwrap();
        assert_eq!(brute.ip, None);
        assert_eq!(brute.email.as_deref(), Some("a@b.com"));
        // But no suspicious-IP alert exists for the IP-less traffic.
        assert!(
            !result
                .alerts
                .iter()
                .any(|a| a.kind == AlertKind::SuspiciousIp)
        );
    }

    #[tokio::test]
    async fn test_alerts_sorted_by_severity_then_count() {
        let log = Arc::new(MemoryAttemptLog::new());
        // Critical: brute force pair with 5 failures.
        for _ in 0..5 {
            log.seed("a@b.com", AttemptStatus::Failed, Some("9.9.9.9"), None, None);
        }
        // High: 12 attempts from another IP.
        for i in 0..12 {
            log.seed(&format!("u{i}@b.com"), AttemptStatus::Attempt, Some("8.8.8.8"), None, None);
        }

        let result = AnalysisService::new(log).analyze(&thresholds()).await.unwrap();

        let severities: Vec<Severity> = result.alerts.iter().map(|a| a.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
        assert_eq!(result.alerts[0].severity, Severity::Critical);

        // Within one severity rank, larger counts come first.
        for pair in result.alerts.windows(2) {
            if pair[0].severity == pair[1].severity {
                assert!(pair[0].count >= pair[1].count);
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_is_idempotent() {
        let log = Arc::new(MemoryAttemptLog::new());
        for _ in 0..6 {
            log.seed("a@b.com", AttemptStatus::Failed, Some("1.2.3.4"), Some("ua"), None);
        }
        let service = AnalysisService::new(log);

        let first = service.analyze(&thresholds()).await.unwrap();
        let second = service.analyze(&thresholds()).await.unwrap();

        assert_eq!(first.stats, second.stats);
        assert_eq!(first.alerts, second.alerts);
    }
}
