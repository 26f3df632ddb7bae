//! Process health monitor.
//!
//! # Responsibilities
//! - Count errors forwarded by the host (exception and rejection taps)
//! - Re-evaluate every threshold on each state read
//! - Escalate a lingering WARN into UNHAPPY after a jittered dwell time
//! - Force UNHAPPY once the optional lifetime window closes
//! - Publish every committed transition to subscribers
//!
//! # Design Decisions
//! - One mutex guards the state and the escalation mark, so a whole
//!   evaluation pass is a single critical section
//! - Counters and the lag estimate are atomics; taps never block and are
//!   safe to call from a panic hook
//! - Background tasks hold weak references and are aborted on destroy or
//!   when the last handle is dropped
//! - Jitter is drawn once at construction so a fleet does not escalate in
//!   lockstep

use std::fmt;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};

use crate::config::MonitorConfig;
use crate::health::logger::{HealthLogger, TracingLogger};
use crate::health::memory::{MemoryProbe, SysinfoProbe};
use crate::health::sampler::{self, LagGauge};
use crate::health::state::{Code, HealthState, Transition};
use crate::observability::metrics;

/// Buffered transitions per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Errors raised while constructing a monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Background work was requested outside a tokio runtime.
    #[error("the {0} needs a running tokio runtime")]
    NoRuntime(&'static str),
}

/// Point-in-time view of a monitor, for diagnostics endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: HealthState,
    pub uncaught_exceptions: u64,
    pub unhandled_rejections: u64,
    pub event_loop_lag_ms: f64,
    pub escalation_limit_secs: f64,
    /// Seconds since the escalation countdown was armed.
    pub escalation_armed_secs: Option<f64>,
    pub uptime_secs: f64,
    pub grace_remaining_secs: f64,
}

struct Core {
    state: HealthState,
    escalation_armed_at: Option<Instant>,
}

struct Inner {
    config: MonitorConfig,
    logger: Option<Arc<dyn HealthLogger>>,
    memory: Arc<dyn MemoryProbe>,
    started_at: Instant,
    grace_period: Duration,
    escalation_limit: Duration,
    uncaught_exceptions: AtomicU64,
    unhandled_rejections: AtomicU64,
    exception_tap: AtomicBool,
    rejection_tap: AtomicBool,
    heap_unavailable_logged: AtomicBool,
    lag: Arc<LagGauge>,
    core: Mutex<Core>,
    events: broadcast::Sender<Transition>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to a process health monitor. Clones share the same monitor.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

/// Builder for [`HealthMonitor`], for injecting a logger or memory probe.
pub struct MonitorBuilder {
    config: MonitorConfig,
    logger: Option<Arc<dyn HealthLogger>>,
    memory: Option<Arc<dyn MemoryProbe>>,
}

impl MonitorBuilder {
    fn new(config: MonitorConfig) -> Self {
        let logger: Option<Arc<dyn HealthLogger>> = if config.log_enabled {
            Some(Arc::new(TracingLogger))
        } else {
            None
        };
        Self {
            config,
            logger,
            memory: None,
        }
    }

    /// Replace the logger. The logger must not call back into the monitor.
    pub fn logger(mut self, logger: Arc<dyn HealthLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Run without any logger.
    pub fn without_logger(mut self) -> Self {
        self.logger = None;
        self
    }

    pub fn memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.memory = Some(probe);
        self
    }

    pub fn build(self) -> Result<HealthMonitor, MonitorError> {
        let config = self.config;
        let sample_lag = config.watches_event_loop();
        let time_limit = config.time_limit();

        let runtime = if sample_lag || time_limit.is_some() {
            let what = if sample_lag {
                "scheduler lag sampler"
            } else {
                "lifetime timer"
            };
            Some(Handle::try_current().map_err(|_| MonitorError::NoRuntime(what))?)
        } else {
            None
        };

        let (exception_soft, exception_hard) = config.exception_limits();
        let (rejection_soft, rejection_hard) = config.rejection_limits();
        let escalation_limit = jitter(
            config.escalation_soft_limit_min,
            config.escalation_soft_limit_max,
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new(Inner {
            logger: self.logger,
            memory: self
                .memory
                .unwrap_or_else(|| Arc::new(SysinfoProbe::new())),
            started_at: Instant::now(),
            grace_period: Duration::from_secs(config.grace_period),
            escalation_limit,
            uncaught_exceptions: AtomicU64::new(0),
            unhandled_rejections: AtomicU64::new(0),
            exception_tap: AtomicBool::new(exception_soft.or(exception_hard).is_some()),
            rejection_tap: AtomicBool::new(rejection_soft.or(rejection_hard).is_some()),
            heap_unavailable_logged: AtomicBool::new(false),
            lag: Arc::new(LagGauge::default()),
            core: Mutex::new(Core {
                state: HealthState::Happy,
                escalation_armed_at: None,
            }),
            events,
            tasks: Mutex::new(Vec::new()),
            config,
        });

        let mut time_limit_after = None;
        if let Some(runtime) = runtime {
            let mut tasks = Vec::new();
            if sample_lag {
                tasks.push(runtime.spawn(sampler::run(inner.lag.clone())));
            }
            if let Some((min, max)) = time_limit {
                let after = jitter(min, max);
                time_limit_after = Some(after);
                tasks.push(runtime.spawn(expire_after(Arc::downgrade(&inner), after)));
            }
            *inner.lock_tasks() = tasks;
        }

        metrics::record_state(&HealthState::Happy);
        tracing::info!(
            grace_period_secs = inner.grace_period.as_secs(),
            escalation_limit_ms = escalation_limit.as_millis() as u64,
            exception_tap = inner.exception_tap.load(Ordering::Relaxed),
            rejection_tap = inner.rejection_tap.load(Ordering::Relaxed),
            lag_sampler = sample_lag,
            time_limit = ?time_limit_after,
            "Health monitor started"
        );

        Ok(HealthMonitor { inner })
    }
}

/// Uniformly random duration in `[min, max]` seconds, millisecond granularity.
fn jitter(min_secs: u64, max_secs: u64) -> Duration {
    let low = min_secs.min(max_secs).saturating_mul(1000);
    let high = min_secs.max(max_secs).saturating_mul(1000);
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

async fn expire_after(inner: std::sync::Weak<Inner>, after: Duration) {
    time::sleep(after).await;
    if let Some(inner) = inner.upgrade() {
        let mut core = inner.lock_core();
        inner.update(
            &mut core,
            HealthState::Unhappy,
            format!("time limit of {:.1}s reached", after.as_secs_f64()),
            Code::TimeLimit,
        );
    }
}

/// First breached limit, hard before soft.
fn breach<T: PartialOrd + Copy>(
    value: T,
    (soft, hard): (Option<T>, Option<T>),
) -> Option<(HealthState, &'static str, T)> {
    if let Some(hard) = hard.filter(|limit| value >= *limit) {
        return Some((HealthState::Unhappy, "hard", hard));
    }
    soft.filter(|limit| value >= *limit)
        .map(|soft| (HealthState::Warn, "soft", soft))
}

impl Inner {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_state(&self, core: &mut Core) {
        let now = Instant::now();
        if now.duration_since(self.started_at) < self.grace_period {
            return;
        }

        let exceptions = self.uncaught_exceptions.load(Ordering::Relaxed);
        if let Some((state, kind, limit)) = breach(exceptions, self.config.exception_limits()) {
            let reason = format!(
                "{} uncaught exceptions reached the {} limit of {}",
                exceptions, kind, limit
            );
            self.update(core, state, reason, Code::UncaughtExceptions);
        }

        let rejections = self.unhandled_rejections.load(Ordering::Relaxed);
        if let Some((state, kind, limit)) = breach(rejections, self.config.rejection_limits()) {
            let reason = format!(
                "{} unhandled rejections reached the {} limit of {}",
                rejections, kind, limit
            );
            self.update(core, state, reason, Code::UnhandledRejections);
        }

        if self.config.watches_memory() {
            let usage = self.memory.sample();
            if let Some((state, kind, limit)) = breach(usage.rss, self.config.rss_limits()) {
                let reason = format!(
                    "resident memory of {} bytes reached the {} limit of {} bytes",
                    usage.rss, kind, limit
                );
                self.update(core, state, reason, Code::Memory);
            }
            let heap_limits = self.config.heap_limits();
            match usage.heap {
                Some(heap) => {
                    if let Some((state, kind, limit)) = breach(heap, heap_limits) {
                        let reason = format!(
                            "heap of {} bytes reached the {} limit of {} bytes",
                            heap, kind, limit
                        );
                        self.update(core, state, reason, Code::Memory);
                    }
                }
                None if heap_limits.0.or(heap_limits.1).is_some() => {
                    if !self.heap_unavailable_logged.swap(true, Ordering::Relaxed) {
                        tracing::warn!(
                            "Heap limits are configured but the memory probe cannot see the allocator; heap rules are skipped"
                        );
                    }
                }
                None => {}
            }
        }

        let lag = self.lag.get();
        if let Some((state, kind, limit)) = breach(lag, self.config.event_loop_limits()) {
            let reason = format!(
                "scheduler lag of {:.1}ms reached the {} limit of {}ms",
                lag, kind, limit
            );
            self.update(core, state, reason, Code::EventLoop);
        }

        match core.escalation_armed_at {
            Some(armed_at) if now.duration_since(armed_at) >= self.escalation_limit => {
                let reason = format!(
                    "WARN not resolved within {:.1}s",
                    self.escalation_limit.as_secs_f64()
                );
                self.update(core, HealthState::Unhappy, reason, Code::Escalation);
            }
            None if !self.escalation_limit.is_zero() && core.state == HealthState::Warn => {
                core.escalation_armed_at = Some(now);
                tracing::debug!(
                    escalation_limit_ms = self.escalation_limit.as_millis() as u64,
                    "Escalation countdown armed"
                );
            }
            _ => {}
        }
    }

    fn update(&self, core: &mut Core, state: HealthState, reason: String, code: Code) {
        if core.state == state || core.state.is_terminal() {
            return;
        }

        let previous = std::mem::replace(&mut core.state, state.clone());
        if let Some(logger) = &self.logger {
            let message = format!(
                "state changed from '{}' to '{}', reason: '{}', code: {}",
                previous, state, reason, code
            );
            if state.is_terminal() {
                logger.error(&message);
            } else {
                logger.warn(&message);
            }
        }

        metrics::record_state(&state);
        metrics::record_transition(&code);

        // No receivers is fine; sending under the lock keeps delivery ordered.
        let _ = self.events.send(Transition {
            state,
            previous,
            reason,
            code,
        });
    }

    fn record_exception(&self, error: &dyn fmt::Display) {
        if !self.exception_tap.load(Ordering::Acquire) {
            return;
        }
        let count = self.uncaught_exceptions.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_signal("uncaught_exception");
        if let Some(logger) = &self.logger {
            logger.error(&format!("uncaught exception #{}: {}", count, error));
        }
    }

    fn record_rejection(&self, error: &dyn fmt::Display) {
        if !self.rejection_tap.load(Ordering::Acquire) {
            return;
        }
        let count = self.unhandled_rejections.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_signal("unhandled_rejection");
        if let Some(logger) = &self.logger {
            logger.error(&format!("unhandled rejection #{}: {}", count, error));
        }
    }

    fn stop_background(&self) -> usize {
        let tasks = std::mem::take(&mut *self.lock_tasks());
        let stopped = tasks.len();
        for task in tasks {
            task.abort();
        }
        stopped
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_background();
    }
}

impl HealthMonitor {
    /// Create a monitor with the default logger and memory probe.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        Self::builder(config).build()
    }

    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder::new(config)
    }

    /// Evaluate every rule, then return the current state.
    pub fn state(&self) -> HealthState {
        let state = {
            let mut core = self.inner.lock_core();
            self.inner.check_state(&mut core);
            core.state.clone()
        };

        if self.inner.config.log_on_unhappy && !state.is_happy() {
            if let Some(logger) = &self.inner.logger {
                let message = format!("returning state '{}'", state);
                if state.is_terminal() {
                    logger.error(&message);
                } else {
                    logger.warn(&message);
                }
            }
        }

        state
    }

    /// Direct assignment. Ignored once UNHAPPY.
    pub fn set_state(&self, state: impl Into<HealthState>) {
        self.update_state(state, "manually changed", Code::Manual);
    }

    /// Move to `state` with an explicit reason and code. Ignored when the
    /// state is unchanged or already UNHAPPY.
    pub fn update_state(
        &self,
        state: impl Into<HealthState>,
        reason: impl Into<String>,
        code: impl Into<Code>,
    ) {
        let mut core = self.inner.lock_core();
        self.inner
            .update(&mut core, state.into(), reason.into(), code.into());
    }

    /// Receive every transition committed from now on, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.inner.events.subscribe()
    }

    /// Exception tap: the host forwards errors it could not handle.
    pub fn record_exception(&self, error: &dyn fmt::Display) {
        self.inner.record_exception(error);
    }

    /// Rejection tap: the host forwards failures of detached async work.
    pub fn record_rejection(&self, error: &dyn fmt::Display) {
        self.inner.record_rejection(error);
    }

    /// Record a rejection when a spawned task panicked or was cancelled.
    pub fn observe_join<T>(&self, result: &Result<T, JoinError>) {
        if let Err(e) = result {
            self.inner.record_rejection(e);
        }
    }

    /// A hook for [`std::panic::set_hook`] that feeds panics into the
    /// exception tap. It holds only a weak reference to the monitor.
    ///
    /// ```no_run
    /// # fn demo(monitor: &vitals::HealthMonitor) {
    /// let tap = monitor.panic_hook();
    /// let previous = std::panic::take_hook();
    /// std::panic::set_hook(Box::new(move |info| {
    ///     tap(info);
    ///     previous(info);
    /// }));
    /// # }
    /// ```
    pub fn panic_hook(&self) -> impl Fn(&PanicHookInfo<'_>) + Send + Sync + 'static {
        let inner = Arc::downgrade(&self.inner);
        move |info: &PanicHookInfo<'_>| {
            if let Some(inner) = inner.upgrade() {
                inner.record_exception(info);
            }
        }
    }

    pub fn uncaught_exceptions(&self) -> u64 {
        self.inner.uncaught_exceptions.load(Ordering::Relaxed)
    }

    pub fn unhandled_rejections(&self) -> u64 {
        self.inner.unhandled_rejections.load(Ordering::Relaxed)
    }

    /// Smoothed scheduler lag in milliseconds.
    pub fn event_loop_lag(&self) -> f64 {
        self.inner.lag.get()
    }

    /// WARN dwell time chosen at construction.
    pub fn escalation_limit(&self) -> Duration {
        self.inner.escalation_limit
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Background tasks (sampler, lifetime timer) still scheduled.
    pub fn pending_tasks(&self) -> usize {
        self.inner
            .lock_tasks()
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Evaluate, then capture counters and timers.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state();
        let now = Instant::now();
        let armed_at = self.inner.lock_core().escalation_armed_at;
        let uptime = now.duration_since(self.inner.started_at);

        Snapshot {
            state,
            uncaught_exceptions: self.uncaught_exceptions(),
            unhandled_rejections: self.unhandled_rejections(),
            event_loop_lag_ms: self.event_loop_lag(),
            escalation_limit_secs: self.inner.escalation_limit.as_secs_f64(),
            escalation_armed_secs: armed_at.map(|at| now.duration_since(at).as_secs_f64()),
            uptime_secs: uptime.as_secs_f64(),
            grace_remaining_secs: self.inner.grace_period.saturating_sub(uptime).as_secs_f64(),
        }
    }

    /// Stop background tasks and detach both taps. Safe to call repeatedly.
    pub fn destroy(&self) {
        self.inner.exception_tap.store(false, Ordering::Release);
        self.inner.rejection_tap.store(false, Ordering::Release);
        let stopped = self.inner.stop_background();
        if stopped > 0 {
            tracing::debug!(tasks = stopped, "Health monitor background tasks stopped");
        }
    }
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("state", &self.inner.lock_core().state)
            .field("uncaught_exceptions", &self.uncaught_exceptions())
            .field("unhandled_rejections", &self.unhandled_rejections())
            .field("escalation_limit", &self.inner.escalation_limit)
            .finish_non_exhaustive()
    }
}
