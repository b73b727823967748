use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use keystone_core::{Failure, Outcome};
use keystone_mediator::PipelineError;

/// HTTP status for a failure code.
///
/// The first failure of a list decides the status of the whole response.
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "Auth.Unauthorized" | "Auth.InvalidCredentials" => StatusCode::UNAUTHORIZED,
        "Auth.Forbidden" | "Auth.TenantMismatch" | "Auth.AccountDisabled" => StatusCode::FORBIDDEN,
        c if c.starts_with("VALIDATION_ERROR") => StatusCode::BAD_REQUEST,
        c if c.ends_with(".NotFound") => StatusCode::NOT_FOUND,
        c if c.ends_with("Conflict") => StatusCode::CONFLICT,
        "Pipeline.Cancelled" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a handler result: `Success` with `status`, failures as an error body.
pub fn outcome_response<T: Serialize>(result: Result<Outcome<T>, PipelineError>, status: StatusCode) -> Response {
    match result {
        Ok(Outcome::Success(data)) => (status, Json(data)).into_response(),
        Ok(Outcome::Failure(failures)) => failures_response(failures),
        Err(err) => pipeline_error_response(err),
    }
}

pub fn pipeline_error_response(err: PipelineError) -> Response {
    if matches!(err, PipelineError::Handler(_) | PipelineError::HandlerNotFound(_)) {
        tracing::error!(error = %err, "unhandled request error");
    }
    failures_response(err.failures())
}

pub fn failures_response(failures: Vec<Failure>) -> Response {
    let Some(first) = failures.first() else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal", "An unexpected error occurred.");
    };

    let status = status_for_code(&first.code);
    (
        status,
        Json(json!({
            "error": first.code,
            "message": first.message,
            "errors": failures,
        })),
    )
        .into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
