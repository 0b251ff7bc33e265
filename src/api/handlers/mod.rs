//! REST endpoint handlers organized by resource.

pub mod push;
pub mod stream;
pub mod system;

use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::app_state::AppState;

/// Composes the upstream-facing routes.
///
/// The non-streaming push endpoints get a request timeout; the streaming
/// endpoint manages its own deadline per read and must not be cut short
/// by a blanket layer.
pub fn routes(request_timeout: Duration) -> Router<AppState> {
    Router::new()
        .merge(push::routes().layer(TimeoutLayer::new(request_timeout)))
        .merge(stream::routes())
}
