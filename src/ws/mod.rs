//! WebSocket layer: upgrade handling, the per-connection loop, and frames.
//!
//! The WebSocket endpoint at `/ws` binds one long-lived duplex connection
//! per user identity. Inbound client frames carrying a correlation id are
//! forwarded to the request/response bridge; outbound wire messages arrive
//! through the registry's per-connection channel.

pub mod connection;
pub mod handler;
pub mod messages;
