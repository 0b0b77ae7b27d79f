//! Operator endpoints, mounted under `/admin` behind basic auth.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch},
    Json, Router,
};
use tracing::info;

use billflow_core::{BillingId, UserId};

use crate::app::{dto, errors, services::AppServices};
use crate::context::AdminContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/billings", get(list_billings))
        .route("/billing/state/next/:id", patch(next_state))
        .route("/billing/state/prev/:id", patch(prev_state))
        .route("/billing/:id", delete(delete_billing))
        .route("/user/:id", delete(delete_user))
}

/// GET /admin/users
pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.directory.get_all().await {
        Ok(users) => (StatusCode::OK, Json(dto::users_to_json(&users))).into_response(),
        Err(e) => errors::directory_error_to_response("list users", e),
    }
}

/// GET /admin/billings
pub async fn list_billings(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.workflow.get_all().await {
        Ok(billings) => (StatusCode::OK, Json(dto::billings_to_json(&billings))).into_response(),
        Err(e) => errors::workflow_error_to_response("list billings", e),
    }
}

/// PATCH /admin/billing/state/next/:id
pub async fn next_state(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<BillingId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match services.workflow.advance(id).await {
        Ok(billing) => {
            info!(admin = admin.username(), billing_id = %id, state = %billing.state(), "billing advanced");
            (StatusCode::OK, Json(dto::BillingResponse::from(&billing))).into_response()
        }
        Err(e) => errors::workflow_error_to_response("advance billing", e),
    }
}

/// PATCH /admin/billing/state/prev/:id
pub async fn prev_state(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<BillingId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match services.workflow.retreat(id).await {
        Ok(billing) => {
            info!(admin = admin.username(), billing_id = %id, state = %billing.state(), "billing retreated");
            (StatusCode::OK, Json(dto::BillingResponse::from(&billing))).into_response()
        }
        Err(e) => errors::workflow_error_to_response("retreat billing", e),
    }
}

/// DELETE /admin/billing/:id
pub async fn delete_billing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<BillingId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match services.workflow.delete(id).await {
        Ok(billing) => {
            info!(admin = admin.username(), billing_id = %id, "billing deleted by admin");
            (StatusCode::OK, Json(dto::BillingResponse::from(&billing))).into_response()
        }
        Err(e) => errors::workflow_error_to_response("delete billing", e),
    }
}

/// DELETE /admin/user/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match services.directory.delete(id).await {
        Ok(user) => {
            info!(admin = admin.username(), user_id = %id, "user deleted by admin");
            (StatusCode::OK, Json(dto::UserResponse::from(&user))).into_response()
        }
        Err(e) => errors::directory_error_to_response("delete user", e),
    }
}
