use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod common;
pub mod roles;
pub mod system;
pub mod tenants;
pub mod users;

/// Every endpoint except `/health`. Authorization happens per request in the
/// mediator pipeline, not at the router.
pub fn router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/whoami", get(system::whoami))
        .route("/users", post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/permissions", get(users::get_permissions).put(users::update_permissions))
        .route("/tenants/:id", get(tenants::get_tenant))
        .route("/tenants/:id/users", get(tenants::list_users))
        .route("/roles", get(roles::list_roles))
        .route("/permissions", get(roles::list_permissions))
}
