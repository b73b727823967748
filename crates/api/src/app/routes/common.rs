use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::Response;
use uuid::Uuid;

use crate::app::errors;

/// Unwrap a JSON body, turning extractor rejections into the API error shape.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| errors::json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", rejection.body_text()))
}

pub fn path_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, Response> {
    id.map(|Path(id)| id)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "malformed id in path"))
}
