//! Origin subsystem: the flaky greeting service.
//!
//! # Data Flow
//! ```text
//! Relay request
//!     → server.rs (request id, api key, usage plan, body limit)
//!     → handler.rs (failure draw, preflight, method and body checks)
//!     → JSON reply
//! ```

pub mod failure;
pub mod handler;
pub mod server;

pub use failure::{AlwaysFail, FailureSource, NeverFail, RandomFailure, ScriptedFailures};
pub use handler::handle;
pub use server::OriginServer;
