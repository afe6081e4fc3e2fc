//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Viewer request at the relay:
//!     → headers.rs (drop spoofed relay-internal and hop-by-hop headers)
//!
//! Origin request at the origin service:
//!     → api_key.rs (shared key attached by the relay, 403 otherwise)
//!     → throttle.rs (per-key usage plan, 429 otherwise)
//!     → origin handler
//! ```

pub mod api_key;
pub mod headers;
pub mod throttle;
