//! Service layer: business logic orchestration.
//!
//! [`RelayService`] runs the single-message delivery pipeline, the
//! concurrent batch dispatcher, and reply forwarding into the
//! request/response bridge.

pub mod relay_service;

pub use relay_service::{BatchItemResult, RelayService, RelayStats};
