//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (environment variables, then flags, overlaid)
//!     → validation.rs (required values, ranges)
//!     → Settings (validated, immutable)
//!     → shared with every subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once validated; there is no reload
//! - All optional fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{CatcherConfig, ListenerConfig, LogFormat, MonitoringConfig, Transport};
pub use settings::{EventFields, MonitoringTarget, Settings};
pub use validation::{validate_config, ValidationError};
