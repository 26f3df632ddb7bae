//! Scheduler lag sampling.
//!
//! A timer task wakes every [`SAMPLE_INTERVAL`]. Whatever time passes beyond
//! the interval is lag: the runtime had the task ready but did not get to it.
//! Lag is folded into an exponentially smoothed estimate so a single late
//! tick does not flip the monitor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::observability::metrics;

pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

const SMOOTHING_FACTOR: f64 = 0.5;

/// Lag beyond the expected interval, in milliseconds.
pub fn lag_ms(elapsed: Duration) -> f64 {
    elapsed.saturating_sub(SAMPLE_INTERVAL).as_secs_f64() * 1000.0
}

/// Fold one lag observation into the running estimate.
pub fn smooth(previous: f64, lag: f64) -> f64 {
    SMOOTHING_FACTOR * lag + (1.0 - SMOOTHING_FACTOR) * previous
}

/// Shared smoothed lag, stored as `f64` bits.
#[derive(Debug, Default)]
pub struct LagGauge(AtomicU64);

impl LagGauge {
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Record the time between two ticks and return the new estimate.
    pub fn observe(&self, elapsed: Duration) -> f64 {
        // Only the sampler task writes, so load-then-store cannot race.
        let next = smooth(self.get(), lag_ms(elapsed));
        self.0.store(next.to_bits(), Ordering::Relaxed);
        next
    }
}

/// Sampling loop. Runs until the task is aborted.
pub(crate) async fn run(gauge: Arc<LagGauge>) {
    let mut ticker = time::interval_at(Instant::now() + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last = Instant::now();
    loop {
        ticker.tick().await;
        let now = Instant::now();
        let lag = gauge.observe(now.duration_since(last));
        last = now;

        metrics::record_event_loop_lag(lag);
        tracing::trace!(lag_ms = lag, "Scheduler lag sampled");
    }
}
