//! Say-hi relay library.
//!
//! A flaky greeting origin, an edge relay with viewer-request and
//! origin-response hooks, and the 307 + `RedirectCount` cookie protocol that
//! turns the origin's transient `502`s into bounded client retries.

pub mod client;
pub mod config;
pub mod edge;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod origin;
pub mod relay;
pub mod security;

pub use config::schema::AppConfig;
pub use edge::RedirectPolicy;
pub use lifecycle::Shutdown;
