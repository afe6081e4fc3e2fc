//! Edge hooks run by the relay around every origin round trip.
//!
//! # Data Flow
//! ```text
//! viewer request
//!     → viewer_request.rs (annotate x-viewer-host)
//!     → [relay forwards to origin]
//!     → origin_response.rs (redirect or pass through)
//!     → client
//! ```
//!
//! Both hooks are pure functions over the message they are given; every
//! signal they need (annotation, CORS flag, counter cookie) travels in the
//! request itself.

pub mod counter;
pub mod origin_response;
pub mod viewer_request;

pub use counter::RedirectCount;
pub use origin_response::{origin_response, RedirectPolicy};
pub use viewer_request::viewer_request;
