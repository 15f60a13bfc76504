//! Service settings for the binary.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RewriterSettings (validated, immutable)
//!     → store, watcher and logging setup in main.rs
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal (or missing) settings files
//! - Validation separates syntactic (serde) from semantic checks
//! - Processor configurations live in the content store, not here

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use schema::{LoggingSettings, RewriterSettings, StoreSettings, WatcherSettings};
pub use validation::{validate_settings, ValidationError};
