//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor and probe produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (state gauge, transition and signal counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
