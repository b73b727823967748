use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use keystone_auth::{Tenant, User};
use keystone_core::{TenantId, UserId};

use super::{RepositoryError, TenantRepository, UserRepository};

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("in-memory store lock poisoned".to_string())
}

/// In-memory user store for tests/dev.
///
/// Email and username are unique across all tenants, compared
/// case-insensitively.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Result<Option<User>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|u| pred(u)).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find(|u| u.email.eq_ignore_ascii_case(email))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.find(|u| u.username.eq_ignore_ascii_case(username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        Ok(self.get_by_username(username).await?.is_some())
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut users: Vec<User> = map.values().filter(|u| u.tenant_id == tenant_id).cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn add(&self, user: &User) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("user {} already exists", user.id)));
        }
        if map.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(RepositoryError::Conflict("email already in use".to_string()));
        }
        if map.values().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(RepositoryError::Conflict("username already in use".to_string()));
        }
        map.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("user {}", user.id))),
        }
    }
}

/// In-memory tenant store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTenantRepository {
    inner: RwLock<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn get_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn add(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&tenant.id) || map.values().any(|t| t.code.eq_ignore_ascii_case(&tenant.code)) {
            return Err(RepositoryError::Conflict(format!("tenant {} already exists", tenant.code)));
        }
        map.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut tenants: Vec<Tenant> = map.values().cloned().collect();
        tenants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tenants)
    }
}
