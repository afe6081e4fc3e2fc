//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Bind origin → Bind relays → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Servers drain → Tasks join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any bind or setup error is fatal
//! - The origin binds before any relay so the first forwarded request has somewhere to go

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, Running, StartupError};
