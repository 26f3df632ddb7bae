//! End-to-end tests for the standalone probe server.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::StatusCode;
use vitals::config::{ProbeConfig, StatusOverride};
use vitals::health::{HealthMonitor, HealthState};
use vitals::probe::STATE_HEADER;
use vitals_client::ProbeClient;

mod common;

#[tokio::test]
async fn happy_monitor_answers_ok() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    let probe = common::start_probe(monitor, ProbeConfig::default()).await;

    let res = common::client()
        .get(probe.url("/_health"))
        .send()
        .await
        .expect("probe unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[STATE_HEADER], "HAPPY");
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.text().await.unwrap(), "HAPPY");

    probe.shutdown.trigger();
}

#[tokio::test]
async fn exceptions_past_the_limit_fail_the_probe() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    let probe = common::start_probe(monitor.clone(), ProbeConfig::default()).await;
    let client = common::client();

    monitor.record_exception(&"first");
    let res = client.get(probe.url("/_health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "one exception is only a warning");
    assert_eq!(res.headers()[STATE_HEADER], "WARN");

    monitor.set_state(HealthState::Unhappy);
    let res = client.get(probe.url("/_health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "UNHAPPY");

    probe.shutdown.trigger();
}

#[tokio::test]
async fn error_status_is_configurable() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    monitor.set_state(HealthState::Unhappy);
    let config = ProbeConfig {
        error_status: 503,
        ..ProbeConfig::default()
    };
    let probe = common::start_probe(monitor, config).await;

    let res = common::client()
        .get(probe.url("/_health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    probe.shutdown.trigger();
}

#[tokio::test]
async fn other_paths_and_methods_are_not_found() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    let probe = common::start_probe(monitor, ProbeConfig::default()).await;
    let client = common::client();

    let res = client.get(probe.url("/elsewhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.post(probe.url("/_health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(probe.url("/_health?verbose=1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "query strings are ignored");

    probe.shutdown.trigger();
}

#[tokio::test]
async fn custom_method_and_path() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    let config = ProbeConfig {
        method: "post".to_string(),
        path: "/ready".to_string(),
        ..ProbeConfig::default()
    };
    let probe = common::start_probe(monitor, config).await;
    let client = common::client();

    let res = client.post(probe.url("/ready")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(probe.url("/ready")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    probe.shutdown.trigger();
}

#[tokio::test]
async fn status_overrides_shape_the_answer() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    monitor.set_state(HealthState::Warn);

    let mut status = HashMap::new();
    status.insert(
        "WARN".to_string(),
        StatusOverride {
            status_code: Some(429),
            body: Some("{\"ok\":false}".to_string()),
            content_type: Some("application/json".to_string()),
        },
    );
    let config = ProbeConfig {
        status,
        ..ProbeConfig::default()
    };
    let probe = common::start_probe(monitor, config).await;

    let res = common::client()
        .get(probe.url("/_health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), "{\"ok\":false}");

    probe.shutdown.trigger();
}

#[tokio::test]
async fn client_reads_state_and_details() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    let config = ProbeConfig {
        details_path: Some("/_health/details".to_string()),
        ..ProbeConfig::default()
    };
    let probe = common::start_probe(monitor.clone(), config).await;
    let client = ProbeClient::new(&format!("http://{}", probe.addr));

    monitor.record_exception(&"boom");

    let report = client.probe("/_health").await.unwrap();
    assert!(report.is_healthy());
    assert_eq!(report.state.as_deref(), Some("WARN"));

    let details = client.details("/_health/details").await.unwrap();
    assert_eq!(details.state, "WARN");
    assert_eq!(details.uncaught_exceptions, 1);
    assert_eq!(details.unhandled_rejections, 0);
    assert!(details.escalation_armed_secs.is_some());

    monitor.set_state(HealthState::Unhappy);
    let report = client.probe("/_health").await.unwrap();
    assert!(!report.is_healthy());
    assert_eq!(report.state.as_deref(), Some("UNHAPPY"));

    probe.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_server_and_monitor() {
    let monitor = HealthMonitor::new(common::eager_monitor_config()).unwrap();
    let probe = common::start_probe(monitor.clone(), ProbeConfig::default()).await;

    probe.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), probe.task)
        .await
        .expect("server did not stop")
        .expect("server task panicked");
    assert!(result.is_ok());

    // Taps are detached once the monitor is destroyed.
    monitor.record_exception(&"late");
    assert_eq!(monitor.uncaught_exceptions(), 0);
    assert_eq!(monitor.pending_tasks(), 0);
}
