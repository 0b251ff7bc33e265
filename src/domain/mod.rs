//! Domain layer: identities, the connection registry, and correlation state.
//!
//! This module contains the server-side domain model: opaque identities,
//! the live-connection registry, mention-based routing against the public
//! account set, the correlation table, and the request/response bridge
//! that links duplex replies back to waiting callers.

pub mod correlation;
pub mod identity;
pub mod mention;
pub mod message;
pub mod public_accounts;
pub mod registry;
pub mod response_bridge;

pub use correlation::CorrelationTable;
pub use identity::Identity;
pub use mention::MentionRouter;
pub use message::{DeliveryReceipt, InboundMessage, OriginalSender, OutboundFrame};
pub use public_accounts::PublicAccountSet;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use response_bridge::{ReplyFrame, RequestResponseBridge};
