//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that min/max windows are ordered
//! - Check that soft limits sit below their hard limits
//! - Validate probe method, path, status codes and bind addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VitalsConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::config::schema::{MonitorConfig, ObservabilityConfig, ProbeConfig, VitalsConfig};

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a whole configuration, collecting every error.
pub fn validate_config(config: &VitalsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_monitor(&config.monitor, &mut errors);
    validate_probe(&config.probe, &mut errors);
    validate_observability(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_monitor(monitor: &MonitorConfig, errors: &mut Vec<ValidationError>) {
    if monitor.escalation_soft_limit_min > monitor.escalation_soft_limit_max {
        errors.push(ValidationError::new(
            "monitor.escalation_soft_limit_min",
            format!(
                "must not exceed escalation_soft_limit_max ({} > {})",
                monitor.escalation_soft_limit_min, monitor.escalation_soft_limit_max
            ),
        ));
    }

    if let (Some(min), Some(max)) = (monitor.time_limit_min, monitor.time_limit_max) {
        if min > max {
            errors.push(ValidationError::new(
                "monitor.time_limit_min",
                format!("must not exceed time_limit_max ({} > {})", min, max),
            ));
        }
    }

    let pairs = [
        ("uncaught_exception", monitor.exception_limits()),
        ("unhandled_rejection", monitor.rejection_limits()),
        ("rss", monitor.rss_limits()),
        ("heap", monitor.heap_limits()),
    ];
    for (name, limits) in pairs {
        if let (Some(soft), Some(hard)) = limits {
            if soft > hard {
                errors.push(ValidationError::new(
                    format!("monitor.{}_soft_limit", name),
                    format!("soft limit {} is above hard limit {}", soft, hard),
                ));
            }
        }
    }

    for (name, limit) in [
        ("event_loop_soft_limit", monitor.event_loop_soft_limit),
        ("event_loop_hard_limit", monitor.event_loop_hard_limit),
    ] {
        if limit.is_some_and(|l| !l.is_finite() || l < 0.0) {
            errors.push(ValidationError::new(
                format!("monitor.{}", name),
                "must be a finite, non-negative number of milliseconds",
            ));
        }
    }
    if let (Some(soft), Some(hard)) = monitor.event_loop_limits() {
        if soft > hard {
            errors.push(ValidationError::new(
                "monitor.event_loop_soft_limit",
                format!("soft limit {} is above hard limit {}", soft, hard),
            ));
        }
    }
}

fn validate_probe(probe: &ProbeConfig, errors: &mut Vec<ValidationError>) {
    if probe.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "probe.bind_address",
            format!("'{}' is not a socket address", probe.bind_address),
        ));
    }

    if Method::from_bytes(probe.method.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "probe.method",
            format!("'{}' is not an HTTP method", probe.method),
        ));
    }

    if !probe.path.starts_with('/') {
        errors.push(ValidationError::new("probe.path", "must start with '/'"));
    }

    if let Some(details) = &probe.details_path {
        if !details.starts_with('/') {
            errors.push(ValidationError::new("probe.details_path", "must start with '/'"));
        } else if details == &probe.path {
            errors.push(ValidationError::new(
                "probe.details_path",
                "must differ from probe.path",
            ));
        }
    }

    if !(400..=599).contains(&probe.error_status) {
        errors.push(ValidationError::new(
            "probe.error_status",
            format!("{} is not an error status (400-599)", probe.error_status),
        ));
    }

    for (state, status) in &probe.status {
        if let Some(code) = status.status_code {
            if StatusCode::from_u16(code).is_err() {
                errors.push(ValidationError::new(
                    format!("probe.status.{}.status_code", state),
                    format!("{} is not a valid HTTP status", code),
                ));
            }
        }
    }
}

fn validate_observability(observability: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StatusOverride;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&VitalsConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = VitalsConfig::default();
        config.monitor.escalation_soft_limit_min = 900;
        config.monitor.rss_soft_limit = Some(5000);
        config.monitor.rss_hard_limit = Some(1000);
        config.probe.path = "health".into();
        config.probe.error_status = 200;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "monitor.escalation_soft_limit_min",
                "monitor.rss_soft_limit",
                "probe.path",
                "probe.error_status",
            ]
        );
    }

    #[test]
    fn rejects_bad_override_status() {
        let mut config = VitalsConfig::default();
        config.probe.status.insert(
            "WARN".into(),
            StatusOverride {
                status_code: Some(42),
                ..StatusOverride::default()
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "probe.status.WARN.status_code");
    }

    #[test]
    fn disabled_limits_are_not_compared() {
        let mut config = VitalsConfig::default();
        config.monitor.heap_soft_limit = Some(5000);
        config.monitor.heap_hard_limit = Some(0);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_negative_event_loop_limit() {
        let mut config = VitalsConfig::default();
        config.monitor.event_loop_hard_limit = Some(-1.0);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "monitor.event_loop_hard_limit");
    }
}
