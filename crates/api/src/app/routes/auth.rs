use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};

use keystone_mediator::RequestContext;

use crate::app::{errors, routes::common, services::AppServices};
use crate::features::Login;

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<Login>, JsonRejection>,
) -> Response {
    let request = match common::json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    errors::outcome_response(services.mediator.send(request, &ctx).await, StatusCode::OK)
}
