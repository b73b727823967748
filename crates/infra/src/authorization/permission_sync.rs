//! Permission synchronizer.
//!
//! Every operation follows the same shape:
//!
//! ```text
//! current claims ──plan──▶ new claims ──apply──▶ user.claims ──persist──▶ UserRepository::update
//! ```
//!
//! Planning is pure and never touches claims of other types. Operations that
//! plan no change return early and skip persistence entirely. When the store
//! fails, the in-memory claims stay as applied; there is no rollback and no
//! retry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use keystone_auth::{Permission, User, UserClaim};

use crate::repositories::{RepositoryError, UserRepository};

#[derive(Debug, Error)]
pub enum SyncError {
    /// The user has no identity (nil id); nothing was changed.
    #[error("invalid user: user id is not set")]
    InvalidUser,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct PermissionSynchronizer {
    users: Arc<dyn UserRepository>,
}

impl PermissionSynchronizer {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Replace the user's permission claims with the catalog set of their role.
    ///
    /// Unknown or missing roles get the standard user set. Always persists once.
    pub async fn sync_permissions_for_user(&self, user: &mut User) -> Result<(), SyncError> {
        ensure_user(user)?;

        let role = user.resolved_role();
        user.claims = plan_replacement(user, role.permissions(), Utc::now());
        self.users.update(user).await?;

        info!(
            user_id = %user.id,
            tenant_id = %user.tenant_id,
            role = %role,
            permissions = role.permissions().len(),
            "synchronized user permissions"
        );
        Ok(())
    }

    /// Grant a single permission. Returns `false` (and persists nothing) when
    /// the user already holds it.
    pub async fn add_permission_to_user(&self, user: &mut User, permission: &Permission) -> Result<bool, SyncError> {
        ensure_user(user)?;

        if user.has_permission_claim(permission.as_str()) {
            debug!(user_id = %user.id, permission = %permission, "permission already granted");
            return Ok(false);
        }

        let claim = UserClaim::permission_for(user, permission, Utc::now());
        user.claims.push(claim);
        self.users.update(user).await?;

        info!(user_id = %user.id, permission = %permission, "permission granted");
        Ok(true)
    }

    /// Revoke a single permission. Returns `false` (and persists nothing) when
    /// the user does not hold it. Only the first matching claim is removed.
    pub async fn remove_permission_from_user(
        &self,
        user: &mut User,
        permission: &Permission,
    ) -> Result<bool, SyncError> {
        ensure_user(user)?;

        let Some(index) = user.claims.iter().position(|c| c.is_permission_value(permission.as_str())) else {
            debug!(user_id = %user.id, permission = %permission, "permission not held");
            return Ok(false);
        };

        user.claims.remove(index);
        self.users.update(user).await?;

        info!(user_id = %user.id, permission = %permission, "permission revoked");
        Ok(true)
    }

    /// Set an explicit permission list (duplicates collapse), independent of
    /// the role. Always persists once.
    pub async fn replace_permissions(&self, user: &mut User, permissions: &[Permission]) -> Result<(), SyncError> {
        ensure_user(user)?;

        user.claims = plan_replacement(user, permissions, Utc::now());
        self.users.update(user).await?;

        info!(user_id = %user.id, permissions = user.permission_claims().count(), "replaced user permissions");
        Ok(())
    }
}

impl std::fmt::Debug for PermissionSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionSynchronizer").finish_non_exhaustive()
    }
}

fn ensure_user(user: &User) -> Result<(), SyncError> {
    if user.id.is_nil() {
        return Err(SyncError::InvalidUser);
    }
    Ok(())
}

/// Non-permission claims in their original order, followed by one fresh
/// claim per distinct permission in `permissions`.
fn plan_replacement(user: &User, permissions: &[Permission], at: DateTime<Utc>) -> Vec<UserClaim> {
    let mut planned: Vec<UserClaim> = user.claims.iter().filter(|c| !c.is_permission()).cloned().collect();

    for permission in permissions {
        if !planned.iter().any(|c| c.is_permission_value(permission.as_str())) {
            planned.push(UserClaim::permission_for(user, permission, at));
        }
    }
    planned
}
