//! HTTP building blocks shared by the origin, the relay and the hooks.
//!
//! # Data Flow
//! ```text
//! viewer request
//!     → request.rs (request id)
//!     → headers.rs (protocol header names)
//!     → cors.rs / cookies.rs (read CORS context and redirect counter)
//!     → body.rs (JSON message/error bodies)
//! ```

pub mod body;
pub mod cookies;
pub mod cors;
pub mod headers;
pub mod request;

pub use body::{ErrorBody, MessageBody, ReplyBody};
pub use cors::CorsContext;
pub use request::{propagate_request_id_layer, set_request_id_layer, MakeRequestUuidV4};
