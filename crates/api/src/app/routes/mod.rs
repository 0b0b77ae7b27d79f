use axum::Router;

pub mod admin;
pub mod billings;
pub mod system;
pub mod users;

/// Router for the unauthenticated user and billing endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(users::router())
        .merge(billings::router())
}
