//! Network layer subsystem.
//!
//! Relay listeners are plain TCP unless the distribution names a
//! certificate, in which case tls.rs loads it before the listener binds.

pub mod tls;
