//! REST/SSE API layer: route handlers, DTOs, and router composition.
//!
//! Push endpoints live under `/sse`; system endpoints sit at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the gateway's REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::push::push_message,
        handlers::push::push_batch,
        handlers::stream::send_with_response,
        handlers::system::health_handler,
        handlers::system::metrics_handler,
    ),
    components(schemas(
        dto::PushRequest,
        dto::PushResponse,
        dto::BatchResponse,
        dto::BatchItemDto,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Push", description = "Upstream message delivery"),
        (name = "System", description = "Health and metrics"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
///
/// `request_timeout` bounds the non-streaming push endpoints only.
pub fn build_router(request_timeout: Duration) -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes(request_timeout))
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
