//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → cloned into the origin service and each relay distribution
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the relay RedirectPolicy
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Listeners, keys and origin URLs require a restart; only the redirect
//!   policy is hot-swapped

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::DistributionConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::OriginConfig;
pub use schema::RedirectConfig;
