//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build monitor → Bind probe listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting probes → Destroy monitor → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then monitor, then listeners
//! - Destroying the monitor only stops its background work; probes keep
//!   answering until the listener closes

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
