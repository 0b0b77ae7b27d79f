use std::sync::Arc;

use axum::{
    extract::{Extension, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new().route("/user", get(get_user).post(create_user))
}

/// GET /user?telegram_username=
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::UserQuery>,
) -> axum::response::Response {
    let Some(handle) = query.telegram_username else {
        return errors::bad_request("telegram_username in query param not found");
    };

    match services.directory.get_by_handle(&handle).await {
        Ok(user) => (StatusCode::OK, Json(dto::UserResponse::from(&user))).into_response(),
        Err(e) => errors::directory_error_to_response("get user by handle", e),
    }
}

/// POST /user
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    if body.telegram_username.is_empty() {
        return errors::bad_request("telegram_username cannot be empty");
    }

    match services.directory.create(&body.telegram_username).await {
        Ok(user) => (StatusCode::OK, Json(dto::UserResponse::from(&user))).into_response(),
        Err(e) => errors::directory_error_to_response("create user", e),
    }
}
