//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: document backend and store/service wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent `{ "message": ... }` error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the tests).
pub fn build_app(services: Arc<services::AppServices>, admin_password: impl Into<Arc<str>>) -> Router {
    let auth_state = middleware::AdminAuthState {
        password: admin_password.into(),
    };

    // Admin routes: require basic auth.
    let admin = routes::admin::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::admin_auth_middleware,
    ));

    Router::new()
        .route("/ping", get(routes::system::ping))
        .merge(routes::router())
        .nest("/admin", admin)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        )
}
