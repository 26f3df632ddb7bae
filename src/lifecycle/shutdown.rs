//! Shutdown coordination for the probe server and the monitor.

use tokio::sync::broadcast;

use crate::health::HealthMonitor;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to,
/// and tears down the registered monitors once triggered.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    monitors: Vec<HealthMonitor>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            monitors: Vec::new(),
        }
    }

    /// Destroy `monitor` when shutdown is triggered.
    pub fn register(&mut self, monitor: HealthMonitor) {
        self.monitors.push(monitor);
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal and destroy registered monitors.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
        for monitor in &self.monitors {
            monitor.destroy();
        }
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
