//! State → HTTP response mapping shared by every adapter.
//!
//! # Design Decisions
//! - Any state short of UNHAPPY answers 200; a WARN process still serves
//!   traffic while its escalation countdown runs
//! - Per-state overrides replace status, body and content type independently
//! - Invalid override values fall back to the defaults instead of failing
//!   the probe

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

use crate::config::ProbeConfig;
use crate::health::HealthState;
use crate::observability::metrics;

/// Header carrying the raw state name on every probe response.
pub const STATE_HEADER: &str = "x-health-state";

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Build the probe response for `state`.
pub fn render(state: &HealthState, config: &ProbeConfig) -> Response {
    let overrides = config.status.get(state.as_str());

    let default_status = if state.is_terminal() {
        config.error_status
    } else {
        StatusCode::OK.as_u16()
    };
    let code = overrides
        .and_then(|o| o.status_code)
        .unwrap_or(default_status);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = overrides
        .and_then(|o| o.body.clone())
        .unwrap_or_else(|| state.to_string());

    let content_type = overrides
        .and_then(|o| o.content_type.as_deref())
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    match HeaderValue::from_str(state.as_str()) {
        Ok(value) => {
            response.headers_mut().insert(STATE_HEADER, value);
        }
        Err(_) => tracing::debug!(state = %state, "State name is not a valid header value"),
    }

    metrics::record_probe(status.as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusOverride;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn happy_is_ok() {
        let response = render(&HealthState::Happy, &ProbeConfig::default());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[STATE_HEADER], "HAPPY");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body_text(response).await, "HAPPY");
    }

    #[tokio::test]
    async fn warn_still_serves() {
        let response = render(&HealthState::Warn, &ProbeConfig::default());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "WARN");
    }

    #[tokio::test]
    async fn unhappy_uses_error_status() {
        let config = ProbeConfig {
            error_status: 503,
            ..ProbeConfig::default()
        };
        let response = render(&HealthState::Unhappy, &config);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(response).await, "UNHAPPY");
    }

    #[tokio::test]
    async fn overrides_apply_per_state() {
        let mut config = ProbeConfig::default();
        config.status.insert(
            "WARN".into(),
            StatusOverride {
                status_code: Some(299),
                body: Some(r#"{"ok":true}"#.into()),
                content_type: Some("application/json".into()),
            },
        );
        config.status.insert(
            "UNHAPPY".into(),
            StatusOverride {
                body: Some("replace me".into()),
                ..StatusOverride::default()
            },
        );

        let warn = render(&HealthState::Warn, &config);
        assert_eq!(warn.status().as_u16(), 299);
        assert_eq!(warn.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_text(warn).await, r#"{"ok":true}"#);

        let unhappy = render(&HealthState::Unhappy, &config);
        assert_eq!(unhappy.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unhappy.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body_text(unhappy).await, "replace me");
    }
}
