//! HTTP probe adapters.
//!
//! # Data Flow
//! ```text
//! Probe request
//!     → middleware.rs (method + path match, else next service)
//!       or handlers.rs (host-mounted route)
//!     → HealthMonitor::state() (every rule re-evaluated)
//!     → response.rs (status, body, content type, x-health-state)
//!
//! Standalone (server.rs):
//!     dedicated listener → middleware → 404 fallback
//! ```
//!
//! # Design Decisions
//! - All adapters share one pure mapping, so they cannot drift apart
//! - Adapters only read the monitor; they never change its state

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;

pub use handlers::{details_handler, probe_handler, ProbeState};
pub use middleware::probe_middleware;
pub use response::{render, STATE_HEADER};
pub use server::ProbeServer;
