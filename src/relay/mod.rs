//! Relay subsystem: the edge in front of the origin.
//!
//! # Data Flow
//! ```text
//! Viewer (one listener per distribution, optional TLS)
//!     → server.rs (buffer, sanitize, viewer-request hook)
//!     → hyper client → origin service
//!     → edge::origin_response (307 retry protocol)
//!     → Viewer
//! ```

pub mod server;

pub use server::{RelayError, RelayServer};
