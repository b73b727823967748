use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response};

use keystone_mediator::RequestContext;

use crate::app::{errors, services::AppServices};
use crate::features::{ListPermissions, ListRoles};

/// GET /roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    errors::outcome_response(services.mediator.send(ListRoles, &ctx).await, StatusCode::OK)
}

/// GET /permissions
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    errors::outcome_response(services.mediator.send(ListPermissions, &ctx).await, StatusCode::OK)
}
