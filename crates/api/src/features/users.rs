use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use keystone_auth::{
    AuthzError, CurrentUser, Permission, RequireAuthorization, Role, User, ensure_tenant_access, users,
};
use keystone_core::{Audit, Failure, Outcome, TenantId, UserId};
use keystone_infra::{PermissionSynchronizer, RepositoryError, TenantRepository, UserRepository};
use keystone_mediator::{PipelineError, Request, RequestContext, RequestHandler, validation_failures};

use crate::app::dto::{PermissionsResponse, UserResponse};

static VIEW_REQUIRES: [Permission; 1] = [users::VIEW];
static CREATE_REQUIRES: [Permission; 1] = [users::CREATE];
static UPDATE_REQUIRES: [Permission; 1] = [users::UPDATE];

fn user_not_found(id: UserId) -> Failure {
    Failure::new("User.NotFound", format!("User with ID '{id}' not found."))
}

/// Load a user the caller is allowed to see, or the failure to report.
async fn load_visible_user(
    users: &dyn UserRepository,
    identity: &dyn CurrentUser,
    id: UserId,
) -> Result<Result<User, Failure>, PipelineError> {
    let Some(user) = users.get_by_id(id).await.context("failed to load user")? else {
        return Ok(Err(user_not_found(id)));
    };
    if let Err(err) = ensure_tenant_access(identity, user.tenant_id) {
        return Ok(Err(err.to_failure()));
    }
    Ok(Ok(user))
}

// ─────────────────────────────────────────────────────────────────────────────
// CreateUser
// ─────────────────────────────────────────────────────────────────────────────

/// Create a user in a tenant and grant the permissions of its role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "First name is required (at most 100 characters)"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Last name is required (at most 100 characters)"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(
        email(message = "A valid email address is required"),
        length(max = 150, message = "Email must be at most 150 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Username is required (at most 100 characters)"))]
    pub username: String,

    #[serde(default, skip_serializing)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 20, message = "Phone number must be at most 20 characters"))]
    pub phone_number: Option<String>,

    #[serde(default = "active_by_default")]
    pub is_active: bool,

    /// Stored as given; unknown names resolve to the standard user set.
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

fn active_by_default() -> bool {
    true
}

impl RequireAuthorization for CreateUser {
    fn required_permissions(&self) -> &[Permission] {
        &CREATE_REQUIRES
    }
}

impl Request for CreateUser {
    type Response = Outcome<UserResponse>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }

    fn validate(&self) -> Result<(), Vec<Failure>> {
        let fields: Outcome<()> = Validate::validate(self).map_err(|e| validation_failures(&e)).into();
        let tenant: Outcome<()> = if self.tenant_id.is_none_or(|t| t.is_nil()) {
            Outcome::failure_with_code("VALIDATION_ERROR_TENANT_ID", "Tenant id is required")
        } else {
            Outcome::success(())
        };
        Outcome::combine([fields, tenant]).into_result()
    }
}

pub struct CreateUserHandler {
    users: Arc<dyn UserRepository>,
    tenants: Arc<dyn TenantRepository>,
    synchronizer: PermissionSynchronizer,
}

impl CreateUserHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tenants: Arc<dyn TenantRepository>,
        synchronizer: PermissionSynchronizer,
    ) -> Self {
        Self {
            users,
            tenants,
            synchronizer,
        }
    }
}

#[async_trait]
impl RequestHandler<CreateUser> for CreateUserHandler {
    async fn handle(&self, request: CreateUser, ctx: &RequestContext) -> Result<Outcome<UserResponse>, PipelineError> {
        let identity = ctx.identity();
        let Some(tenant_id) = request.tenant_id else {
            return Ok(Outcome::failure(Failure::new("VALIDATION_ERROR_TENANT_ID", "Tenant id is required")));
        };

        if let Err(err) = ensure_tenant_access(identity, tenant_id) {
            return Ok(Outcome::failure(err.to_failure()));
        }
        // Only admins hand out the admin role.
        if Role::from_name(request.role.as_deref()).is_admin() && !identity.is_admin() {
            return Ok(Outcome::failure(AuthzError::Forbidden { required: vec![] }.to_failure()));
        }

        if self.tenants.get_by_id(tenant_id).await.context("failed to load tenant")?.is_none() {
            return Ok(Outcome::failure(Failure::new(
                "Tenant.NotFound",
                format!("Tenant with ID '{tenant_id}' not found."),
            )));
        }
        if self.users.exists_by_email(&request.email).await.context("failed to check email")? {
            return Ok(Outcome::failure(Failure::new(
                "User.EmailConflict",
                format!("User with email '{}' already exists.", request.email),
            )));
        }
        if self.users.exists_by_username(&request.username).await.context("failed to check username")? {
            return Ok(Outcome::failure(Failure::new(
                "User.UsernameConflict",
                format!("User with username '{}' already exists.", request.username),
            )));
        }

        let password_hash = super::hash_password(request.password).await?;

        let now = Utc::now();
        let audit = match identity.id() {
            Some(actor) => Audit::created_by(actor, identity.username().map(str::to_string), now),
            None => Audit::system(now),
        };

        let mut user = User::new(UserId::new(), tenant_id, request.username, request.email, audit);
        user.first_name = request.first_name;
        user.last_name = request.last_name;
        user.password_hash = password_hash;
        user.phone_number = request.phone_number;
        user.is_active = request.is_active;
        user.role = request.role;

        match self.users.add(&user).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(message)) => {
                return Ok(Outcome::failure(Failure::new("User.Conflict", message)));
            }
            Err(err) => return Err(anyhow::Error::new(err).context("failed to store user").into()),
        }

        self.synchronizer
            .sync_permissions_for_user(&mut user)
            .await
            .context("failed to synchronize permissions")?;

        info!(user_id = %user.id, tenant_id = %tenant_id, role = %user.resolved_role(), "user created");
        Ok(Outcome::success(UserResponse::from(&user)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GetUserById
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GetUserById {
    pub id: UserId,
}

impl RequireAuthorization for GetUserById {
    fn required_permissions(&self) -> &[Permission] {
        &VIEW_REQUIRES
    }
}

impl Request for GetUserById {
    type Response = Outcome<UserResponse>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

pub struct GetUserByIdHandler {
    users: Arc<dyn UserRepository>,
}

impl GetUserByIdHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler<GetUserById> for GetUserByIdHandler {
    async fn handle(&self, request: GetUserById, ctx: &RequestContext) -> Result<Outcome<UserResponse>, PipelineError> {
        Ok(match load_visible_user(self.users.as_ref(), ctx.identity(), request.id).await? {
            Ok(user) => Outcome::success(UserResponse::from(&user)),
            Err(failure) => Outcome::failure(failure),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GetUserPermissions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GetUserPermissions {
    pub user_id: UserId,
}

impl RequireAuthorization for GetUserPermissions {
    fn required_permissions(&self) -> &[Permission] {
        &VIEW_REQUIRES
    }
}

impl Request for GetUserPermissions {
    type Response = Outcome<PermissionsResponse>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

pub struct GetUserPermissionsHandler {
    users: Arc<dyn UserRepository>,
}

impl GetUserPermissionsHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler<GetUserPermissions> for GetUserPermissionsHandler {
    async fn handle(
        &self,
        request: GetUserPermissions,
        ctx: &RequestContext,
    ) -> Result<Outcome<PermissionsResponse>, PipelineError> {
        Ok(match load_visible_user(self.users.as_ref(), ctx.identity(), request.user_id).await? {
            Ok(user) => Outcome::success(PermissionsResponse::from(&user)),
            Err(failure) => Outcome::failure(failure),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UpdateUserPermissions
// ─────────────────────────────────────────────────────────────────────────────

/// Replace a user's permission claims with an explicit list.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserPermissions {
    pub user_id: UserId,
    pub permissions: Vec<String>,
}

impl RequireAuthorization for UpdateUserPermissions {
    fn required_permissions(&self) -> &[Permission] {
        &UPDATE_REQUIRES
    }
}

impl Request for UpdateUserPermissions {
    type Response = Outcome<PermissionsResponse>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }

    fn validate(&self) -> Result<(), Vec<Failure>> {
        let user_id: Outcome<()> = if self.user_id.is_nil() {
            Outcome::failure_with_code("VALIDATION_ERROR_USER_ID", "User ID is required.")
        } else {
            Outcome::success(())
        };
        let names: Outcome<()> = if self.permissions.iter().any(|p| p.trim().is_empty()) {
            Outcome::failure_with_code("VALIDATION_ERROR_PERMISSIONS", "Permission names cannot be blank.")
        } else {
            Outcome::success(())
        };
        Outcome::combine([user_id, names]).into_result()
    }
}

pub struct UpdateUserPermissionsHandler {
    users: Arc<dyn UserRepository>,
    synchronizer: PermissionSynchronizer,
}

impl UpdateUserPermissionsHandler {
    pub fn new(users: Arc<dyn UserRepository>, synchronizer: PermissionSynchronizer) -> Self {
        Self { users, synchronizer }
    }
}

#[async_trait]
impl RequestHandler<UpdateUserPermissions> for UpdateUserPermissionsHandler {
    async fn handle(
        &self,
        request: UpdateUserPermissions,
        ctx: &RequestContext,
    ) -> Result<Outcome<PermissionsResponse>, PipelineError> {
        let identity = ctx.identity();
        let mut user = match load_visible_user(self.users.as_ref(), identity, request.user_id).await? {
            Ok(user) => user,
            Err(failure) => return Ok(Outcome::failure(failure)),
        };

        let permissions: Vec<Permission> =
            request.permissions.iter().map(|p| Permission::new(p.trim().to_string())).collect();

        // Admin accounts are managed by admins only.
        if user.resolved_role().is_admin() && !identity.is_admin() {
            return Ok(Outcome::failure(AuthzError::Forbidden { required: vec![] }.to_failure()));
        }
        // Non-admins may only grant what they hold themselves.
        if !identity.is_admin() && !identity.has_permissions(&permissions) {
            return Ok(Outcome::failure(AuthzError::Forbidden { required: permissions }.to_failure()));
        }

        user.audit.touch(identity.id(), identity.username().map(str::to_string), Utc::now());
        self.synchronizer
            .replace_permissions(&mut user, &permissions)
            .await
            .context("failed to update permissions")?;

        Ok(Outcome::success(PermissionsResponse::from(&user)))
    }
}
