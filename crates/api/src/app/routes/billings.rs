use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use billflow_core::{BillingId, UserId};
use billflow_services::WorkflowError;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/billing", get(list_billings).post(create_billing))
        .route("/billing/:id", patch(submit_brief_info))
}

/// GET /billing?user_id=
pub async fn list_billings(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::BillingQuery>,
) -> axum::response::Response {
    let Some(user_id) = query.user_id else {
        return errors::bad_request("user_id in query param not found");
    };
    let owner_id = match user_id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match services.workflow.get_all_by_owner(owner_id).await {
        Ok(billings) => (StatusCode::OK, Json(dto::billings_to_json(&billings))).into_response(),
        Err(e) => errors::workflow_error_to_response("list billings by owner", e),
    }
}

/// POST /billing
pub async fn create_billing(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateBillingRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    if body.user_id.is_empty() {
        return errors::bad_request("user_id cannot be empty");
    }
    let owner_id = match body.user_id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match services.workflow.create(owner_id).await {
        Ok(billing) => (StatusCode::OK, Json(dto::BillingResponse::from(&billing))).into_response(),
        Err(e) => errors::workflow_error_to_response("create billing", e),
    }
}

/// PATCH /billing/:id - record brief info and move the billing out of its current stage
///
/// A missing billing or one that already carries brief info is reported before the
/// body is looked at.
pub async fn submit_brief_info(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::BriefInfoRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match id.parse::<BillingId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(&e),
    };
    match services.workflow.get_by_id(id).await {
        Ok(billing) if billing.brief_info().is_set() => {
            return errors::workflow_error_to_response(
                "submit brief info",
                WorkflowError::BriefInfoAlreadySet,
            );
        }
        Ok(_) => {}
        Err(e) => return errors::workflow_error_to_response("submit brief info", e),
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    if body.username.is_empty() {
        return errors::bad_request("username cannot be empty");
    }

    match services.workflow.submit_brief_info(id, &body.username).await {
        Ok(billing) => (StatusCode::OK, Json(dto::BillingResponse::from(&billing))).into_response(),
        Err(e) => errors::workflow_error_to_response("submit brief info", e),
    }
}
