//! Application wiring: router assembly and shared services.

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use services::AppServices;

/// Assemble the full router with `services` injected as a request extension.
pub fn build_router(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/orders", routes::orders::router())
        .nest("/stock", routes::stock::router())
        .layer(ServiceBuilder::new().layer(Extension(Arc::new(services))))
}
