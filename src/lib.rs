//! Process health-state tracker with an HTTP probe for orchestrators.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod probe;

pub use config::schema::VitalsConfig;
pub use health::{HealthMonitor, HealthState};
pub use lifecycle::Shutdown;
pub use probe::ProbeServer;
