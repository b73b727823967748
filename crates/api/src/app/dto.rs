//! Response DTOs and their mapping from domain records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keystone_auth::{IssuedToken, Tenant, User};
use keystone_core::{TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub email_confirmed: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub role: Option<String>,
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by_id: UserId,
    pub updated_by_id: Option<UserId>,
    pub created_by_name: Option<String>,
    pub updated_by_name: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            phone_number: user.phone_number.clone(),
            is_active: user.is_active,
            email_confirmed: user.email_confirmed,
            last_login_at: user.last_login_at,
            role: user.role.clone(),
            tenant_id: user.tenant_id,
            created_at: user.audit.created_at,
            updated_at: user.audit.updated_at,
            created_by_id: user.audit.created_by_id,
            updated_by_id: user.audit.updated_by_id,
            created_by_name: user.audit.created_by_name.clone(),
            updated_by_name: user.audit.updated_by_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantResponse {
    pub id: TenantId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub domain: String,
    pub is_active: bool,
    pub subscription_plan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by_id: UserId,
    pub updated_by_id: Option<UserId>,
    pub created_by_name: Option<String>,
    pub updated_by_name: Option<String>,
}

impl From<&Tenant> for TenantResponse {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            code: tenant.code.clone(),
            description: tenant.description.clone(),
            domain: tenant.domain.clone(),
            is_active: tenant.is_active,
            subscription_plan: tenant.subscription_plan.clone(),
            created_at: tenant.audit.created_at,
            updated_at: tenant.audit.updated_at,
            created_by_id: tenant.audit.created_by_id,
            updated_by_id: tenant.audit.updated_by_id,
            created_by_name: tenant.audit.created_by_name.clone(),
            updated_by_name: tenant.audit.updated_by_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsResponse {
    pub user_id: UserId,
    pub permissions: Vec<String>,
}

impl From<&User> for PermissionsResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            permissions: user.permission_values().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Body of `PUT /users/:id/permissions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePermissionsBody {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub tenant_id: TenantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: LoginUser,
}

impl LoginResponse {
    pub fn new(token: IssuedToken, user: &User) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
            user: LoginUser {
                id: user.id,
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                role: user.role.clone(),
                tenant_id: user.tenant_id,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
}
