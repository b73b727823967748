use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Response,
};
use uuid::Uuid;

use keystone_core::UserId;
use keystone_mediator::RequestContext;

use crate::app::{dto::UpdatePermissionsBody, errors, routes::common, services::AppServices};
use crate::features::{CreateUser, GetUserById, GetUserPermissions, UpdateUserPermissions};

/// POST /users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Response {
    let request = match common::json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    errors::outcome_response(services.mediator.send(request, &ctx).await, StatusCode::CREATED)
}

/// GET /users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match common::path_id(id) {
        Ok(id) => UserId::from_uuid(id),
        Err(response) => return response,
    };
    errors::outcome_response(services.mediator.send(GetUserById { id }, &ctx).await, StatusCode::OK)
}

/// GET /users/:id/permissions
pub async fn get_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let user_id = match common::path_id(id) {
        Ok(id) => UserId::from_uuid(id),
        Err(response) => return response,
    };
    errors::outcome_response(services.mediator.send(GetUserPermissions { user_id }, &ctx).await, StatusCode::OK)
}

/// PUT /users/:id/permissions
pub async fn update_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePermissionsBody>, JsonRejection>,
) -> Response {
    let user_id = match common::path_id(id) {
        Ok(id) => UserId::from_uuid(id),
        Err(response) => return response,
    };
    let body = match common::json_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let request = UpdateUserPermissions {
        user_id,
        permissions: body.permissions,
    };
    errors::outcome_response(services.mediator.send(request, &ctx).await, StatusCode::OK)
}
