//! # relay-gateway
//!
//! WebSocket relay gateway bridging one-shot upstream push messages to
//! long-lived per-user duplex connections.
//!
//! Upstream systems push messages addressed by user identity over HTTP;
//! the gateway delivers them to that identity's live WebSocket connection,
//! optionally redirecting to a mentioned public account. A streaming
//! endpoint turns an asynchronous WebSocket reply into a synchronous-looking
//! server-sent-event response, matched by correlation identifier.
//!
//! ## Architecture
//!
//! ```text
//! Upstream (HTTP push, SSE)          Clients (WebSocket)
//!     │                                  │
//!     ├── Push/Stream Handlers (api/)    ├── WS Handler (ws/)
//!     │                                  │
//!     └────────── RelayService (service/)
//!                     │
//!         ├── ConnectionRegistry (domain/)
//!         ├── MentionRouter + PublicAccountSet (domain/)
//!         ├── CorrelationTable (domain/)
//!         └── RequestResponseBridge (domain/)
//! ```
//!
//! All state is in-memory and lost on restart by design; the gateway
//! queues nothing for absent identities.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
