use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response};

use keystone_mediator::RequestContext;

use crate::app::{errors, services::AppServices};
use crate::features::WhoAmI;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    errors::outcome_response(services.mediator.send(WhoAmI, &ctx).await, StatusCode::OK)
}
