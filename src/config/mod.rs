//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → VitalsConfig (validated, immutable)
//!     → MonitorConfig snapshot handed to the HealthMonitor
//!     → ProbeConfig handed to the probe adapters
//! ```
//!
//! # Design Decisions
//! - Thresholds are fixed at monitor construction; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::MonitorConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProbeConfig;
pub use schema::StatusOverride;
pub use schema::VitalsConfig;
