use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::PathRejection},
    http::StatusCode,
    response::Response,
};
use uuid::Uuid;

use keystone_core::TenantId;
use keystone_mediator::RequestContext;

use crate::app::{errors, routes::common, services::AppServices};
use crate::features::{GetTenantById, ListTenantUsers};

/// GET /tenants/:id
pub async fn get_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match common::path_id(id) {
        Ok(id) => TenantId::from_uuid(id),
        Err(response) => return response,
    };
    errors::outcome_response(services.mediator.send(GetTenantById { id }, &ctx).await, StatusCode::OK)
}

/// GET /tenants/:id/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let tenant_id = match common::path_id(id) {
        Ok(id) => TenantId::from_uuid(id),
        Err(response) => return response,
    };
    errors::outcome_response(services.mediator.send(ListTenantUsers { tenant_id }, &ctx).await, StatusCode::OK)
}
