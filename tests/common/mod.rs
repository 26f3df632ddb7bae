//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use vitals::config::{MonitorConfig, ProbeConfig};
use vitals::health::HealthMonitor;
use vitals::lifecycle::Shutdown;
use vitals::probe::ProbeServer;

/// Monitor config with no grace period, so rules apply immediately.
#[allow(dead_code)]
pub fn eager_monitor_config() -> MonitorConfig {
    MonitorConfig {
        grace_period: 0,
        log_enabled: false,
        ..MonitorConfig::default()
    }
}

/// A running probe server on an ephemeral loopback port.
#[allow(dead_code)]
pub struct RunningProbe {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningProbe {
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a standalone probe server for `monitor`.
#[allow(dead_code)]
pub async fn start_probe(monitor: HealthMonitor, config: ProbeConfig) -> RunningProbe {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut shutdown = Shutdown::new();
    shutdown.register(monitor.clone());
    let server = ProbeServer::new(monitor, config);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningProbe {
        addr,
        shutdown,
        task,
    }
}

/// HTTP client that never reuses connections between requests.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
