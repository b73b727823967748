//! Requests served by the API and their handlers, one module per area.
//!
//! Each request type declares what it needs (validation rules, required
//! permissions); the mediator pipeline enforces both before a handler runs.
//! Handlers only deal with lookups, tenant isolation and persistence.

pub mod auth;
pub mod roles;
pub mod tenants;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Context;

use keystone_auth::password;

pub use auth::{Login, LoginHandler, WhoAmI, WhoAmIHandler};
pub use roles::{ListPermissions, ListPermissionsHandler, ListRoles, ListRolesHandler};
pub use tenants::{GetTenantById, GetTenantByIdHandler, ListTenantUsers, ListTenantUsersHandler};
pub use users::{
    CreateUser, CreateUserHandler, GetUserById, GetUserByIdHandler, GetUserPermissions, GetUserPermissionsHandler,
    UpdateUserPermissions, UpdateUserPermissionsHandler,
};

/// Hashing runs on the blocking pool.
pub(crate) async fn hash_password(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

pub(crate) async fn verify_password(plain: String, stored_hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored_hash))
        .await
        .context("password verification task failed")?
        .context("stored password hash is malformed")
}
