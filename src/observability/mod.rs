//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Origin handler, hooks and relay produce:
//!     → logging.rs (structured log events, request id in every span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (plain or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
