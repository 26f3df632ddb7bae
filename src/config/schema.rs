//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor
//! and its probe endpoint. All types derive Serde traits for deserialization
//! from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VitalsConfig {
    /// Health thresholds and timers.
    pub monitor: MonitorConfig,

    /// Probe endpoint settings.
    pub probe: ProbeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Threshold snapshot handed to a [`HealthMonitor`](crate::health::HealthMonitor).
///
/// Every limit is optional. A missing or zero limit disables its rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Lower bound of the WARN dwell time before escalating, in seconds.
    pub escalation_soft_limit_min: u64,

    /// Upper bound of the WARN dwell time before escalating, in seconds.
    pub escalation_soft_limit_max: u64,

    pub uncaught_exception_soft_limit: Option<u64>,
    pub uncaught_exception_hard_limit: Option<u64>,

    pub unhandled_rejection_soft_limit: Option<u64>,
    pub unhandled_rejection_hard_limit: Option<u64>,

    /// Resident set size limits in bytes.
    pub rss_soft_limit: Option<u64>,
    pub rss_hard_limit: Option<u64>,

    /// Heap size limits in bytes.
    pub heap_soft_limit: Option<u64>,
    pub heap_hard_limit: Option<u64>,

    /// Smoothed scheduler lag limits in milliseconds.
    pub event_loop_soft_limit: Option<f64>,
    pub event_loop_hard_limit: Option<f64>,

    /// Lifetime window in seconds. Both bounds must be set for the timer to arm.
    pub time_limit_min: Option<u64>,
    pub time_limit_max: Option<u64>,

    /// Startup window in seconds during which no rule is evaluated.
    pub grace_period: u64,

    /// Log every read that returns a state other than HAPPY.
    pub log_on_unhappy: bool,

    /// Install the default tracing logger. `false` runs the monitor silently.
    pub log_enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            escalation_soft_limit_min: 60,
            escalation_soft_limit_max: 600,
            uncaught_exception_soft_limit: Some(1),
            uncaught_exception_hard_limit: None,
            unhandled_rejection_soft_limit: None,
            unhandled_rejection_hard_limit: None,
            rss_soft_limit: None,
            rss_hard_limit: None,
            heap_soft_limit: None,
            heap_hard_limit: None,
            event_loop_soft_limit: None,
            event_loop_hard_limit: None,
            time_limit_min: None,
            time_limit_max: None,
            grace_period: 300,
            log_on_unhappy: true,
            log_enabled: true,
        }
    }
}

impl MonitorConfig {
    pub(crate) fn exception_limits(&self) -> (Option<u64>, Option<u64>) {
        (
            enabled(self.uncaught_exception_soft_limit),
            enabled(self.uncaught_exception_hard_limit),
        )
    }

    pub(crate) fn rejection_limits(&self) -> (Option<u64>, Option<u64>) {
        (
            enabled(self.unhandled_rejection_soft_limit),
            enabled(self.unhandled_rejection_hard_limit),
        )
    }

    pub(crate) fn rss_limits(&self) -> (Option<u64>, Option<u64>) {
        (enabled(self.rss_soft_limit), enabled(self.rss_hard_limit))
    }

    pub(crate) fn heap_limits(&self) -> (Option<u64>, Option<u64>) {
        (enabled(self.heap_soft_limit), enabled(self.heap_hard_limit))
    }

    pub(crate) fn event_loop_limits(&self) -> (Option<f64>, Option<f64>) {
        let on = |v: Option<f64>| v.filter(|l| *l > 0.0);
        (on(self.event_loop_soft_limit), on(self.event_loop_hard_limit))
    }

    /// Lifetime window, only when both ends are set.
    pub(crate) fn time_limit(&self) -> Option<(u64, u64)> {
        match (enabled(self.time_limit_min), enabled(self.time_limit_max)) {
            (Some(min), Some(max)) => Some((min.min(max), min.max(max))),
            _ => None,
        }
    }

    pub(crate) fn watches_memory(&self) -> bool {
        let (rss_soft, rss_hard) = self.rss_limits();
        let (heap_soft, heap_hard) = self.heap_limits();
        rss_soft.or(rss_hard).or(heap_soft).or(heap_hard).is_some()
    }

    pub(crate) fn watches_event_loop(&self) -> bool {
        let (soft, hard) = self.event_loop_limits();
        soft.or(hard).is_some()
    }
}

fn enabled(limit: Option<u64>) -> Option<u64> {
    limit.filter(|l| *l > 0)
}

/// Probe endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Bind address of the standalone probe server (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// HTTP method the probe answers.
    pub method: String,

    /// Path the probe answers.
    pub path: String,

    /// Status returned once the monitor is UNHAPPY.
    pub error_status: u16,

    /// Optional path serving a JSON snapshot of the monitor.
    pub details_path: Option<String>,

    /// Per-state response overrides keyed by state name.
    pub status: HashMap<String, StatusOverride>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            method: "GET".to_string(),
            path: "/_health".to_string(),
            error_status: 500,
            details_path: None,
            status: HashMap::new(),
        }
    }
}

/// Response override for a single state.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StatusOverride {
    pub status_code: Option<u16>,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.escalation_soft_limit_min, 60);
        assert_eq!(config.escalation_soft_limit_max, 600);
        assert_eq!(config.uncaught_exception_soft_limit, Some(1));
        assert_eq!(config.grace_period, 300);
        assert!(config.log_on_unhappy);
        assert!(!config.watches_memory());
        assert!(!config.watches_event_loop());
        assert!(config.time_limit().is_none());
    }

    #[test]
    fn zero_limits_are_disabled() {
        let config = MonitorConfig {
            uncaught_exception_soft_limit: Some(0),
            rss_hard_limit: Some(0),
            event_loop_soft_limit: Some(0.0),
            ..MonitorConfig::default()
        };
        assert_eq!(config.exception_limits(), (None, None));
        assert!(!config.watches_memory());
        assert!(!config.watches_event_loop());
    }

    #[test]
    fn time_limit_needs_both_bounds() {
        let half = MonitorConfig {
            time_limit_min: Some(5),
            ..MonitorConfig::default()
        };
        assert!(half.time_limit().is_none());

        let reversed = MonitorConfig {
            time_limit_min: Some(9),
            time_limit_max: Some(3),
            ..MonitorConfig::default()
        };
        assert_eq!(reversed.time_limit(), Some((3, 9)));
    }

    #[test]
    fn parses_partial_toml() {
        let config: VitalsConfig = toml::from_str(
            r#"
            [monitor]
            grace_period = 0
            rss_soft_limit = 2000

            [probe]
            path = "/healthz"

            [probe.status.WARN]
            status_code = 203
            body = "degraded"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.grace_period, 0);
        assert_eq!(config.monitor.rss_soft_limit, Some(2000));
        assert_eq!(config.monitor.escalation_soft_limit_max, 600);
        assert_eq!(config.probe.path, "/healthz");
        assert_eq!(config.probe.method, "GET");
        assert_eq!(config.probe.status["WARN"].status_code, Some(203));
        assert_eq!(config.observability.log_level, "info");
    }
}
