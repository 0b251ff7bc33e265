//! Data Transfer Objects for REST request/response serialization.
//!
//! Wire field names follow the upstream push contract: targets are
//! addressed by `user_id` and payloads travel under `data`.

pub mod push_dto;

pub use push_dto::*;
