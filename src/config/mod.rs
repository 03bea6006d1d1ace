//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! routekit.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → shared with the server, route builder and dispatcher
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{DevConfig, LogFormat, ObservabilityConfig, ServerConfig, SiteConfig, SiteSettings};
pub use validation::{validate_config, ValidationError};
