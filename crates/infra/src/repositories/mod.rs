//! User and tenant persistence.
//!
//! Handlers and the permission synchronizer talk to the traits only; the
//! in-memory implementations back tests and local runs, the Postgres ones
//! back deployments.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use keystone_auth::{Tenant, User};
use keystone_core::{TenantId, UserId};

pub use in_memory::{InMemoryTenantRepository, InMemoryUserRepository};
pub use postgres::{PostgresTenantRepository, PostgresUserRepository, migrate};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError>;

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>, RepositoryError>;

    /// Insert a new user with its claims.
    async fn add(&self, user: &User) -> Result<(), RepositoryError>;

    /// Persist the user's current state, claims included, as one write.
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn get_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError>;

    async fn add(&self, tenant: &Tenant) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<Tenant>, RepositoryError>;
}

#[async_trait]
impl<R> UserRepository for Arc<R>
where
    R: UserRepository + ?Sized,
{
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        (**self).get_by_id(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        (**self).get_by_email(email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        (**self).get_by_username(username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        (**self).exists_by_email(email).await
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        (**self).exists_by_username(username).await
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>, RepositoryError> {
        (**self).list_by_tenant(tenant_id).await
    }

    async fn add(&self, user: &User) -> Result<(), RepositoryError> {
        (**self).add(user).await
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        (**self).update(user).await
    }
}
