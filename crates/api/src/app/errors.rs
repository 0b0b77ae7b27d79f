use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use billflow_core::DomainError;
use billflow_services::{DirectoryError, WorkflowError};

pub const INTERNAL_ERROR: &str = "internal server error";

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "message": message.into() }))).into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, message)
}

/// Log the underlying failure and answer with an opaque 500.
pub fn internal_error(operation: &'static str, err: &dyn std::error::Error) -> axum::response::Response {
    error!(operation, error = %err, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
}

pub fn body_rejection(rejection: JsonRejection) -> axum::response::Response {
    bad_request(format!("wrong structure body: {}", rejection.body_text()))
}

pub fn domain_error_to_response(err: &DomainError) -> axum::response::Response {
    match err {
        // Validation messages are already user-facing ("username cannot be empty").
        DomainError::Validation(msg) => bad_request(msg.clone()),
        other => bad_request(other.to_string()),
    }
}

pub fn workflow_error_to_response(
    operation: &'static str,
    err: WorkflowError,
) -> axum::response::Response {
    match &err {
        WorkflowError::UserNotFound
        | WorkflowError::BillingNotFound
        | WorkflowError::BriefInfoAlreadySet => bad_request(err.to_string()),
        WorkflowError::Domain(e) => domain_error_to_response(e),
        WorkflowError::Repository { .. } => internal_error(operation, &err),
    }
}

pub fn directory_error_to_response(
    operation: &'static str,
    err: DirectoryError,
) -> axum::response::Response {
    match &err {
        DirectoryError::UserNotFound | DirectoryError::ExistingUser => bad_request(err.to_string()),
        DirectoryError::Domain(e) => domain_error_to_response(e),
        DirectoryError::Repository { .. } => internal_error(operation, &err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billflow_infra::RepositoryError;

    #[test]
    fn state_machine_errors_are_bad_requests() {
        let res = workflow_error_to_response(
            "advance",
            WorkflowError::Domain(DomainError::NextFromCompleted),
        );
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn repository_failures_are_internal() {
        let res = directory_error_to_response(
            "create user",
            DirectoryError::Repository {
                context: "create user",
                source: RepositoryError::NotFound,
            },
        );
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
