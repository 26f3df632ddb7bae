//! Process health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Signal taps (monitor.rs):
//!     Host forwards errors / panics / failed joins
//!     → Increment exception or rejection counter
//!
//! Lag sampler (sampler.rs):
//!     250ms timer task
//!     → Smoothed scheduler lag
//!
//! Memory (memory.rs):
//!     Sampled fresh on each evaluation that needs it
//!
//! State read (monitor.rs):
//!     Grace period check
//!     → Threshold rules in fixed order
//!     → Escalation countdown
//!     → Transition published to subscribers
//! ```
//!
//! # Design Decisions
//! - UNHAPPY is terminal; nothing moves the monitor out of it
//! - Rules are evaluated lazily on read, so readers never see stale state
//! - Transitions are delivered on a broadcast channel in commit order

pub mod logger;
pub mod memory;
pub mod monitor;
pub mod sampler;
pub mod state;

pub use logger::{HealthLogger, MemoryLogger, TracingLogger};
pub use memory::{CountingAllocator, MemoryProbe, MemoryUsage, StaticProbe, SysinfoProbe};
pub use monitor::{HealthMonitor, MonitorBuilder, MonitorError, Snapshot};
pub use state::{Code, HealthState, Transition};
