//! Permission catalog: the static role → permission bindings.
//!
//! Everything here is data. Adding a resource means adding constants in
//! [`crate::permissions`]; adding a role means adding a [`Role`] variant and
//! one binding below. No other code path changes.

use serde::Serialize;

use crate::permissions::{tenants, users};
use crate::{Permission, Role};

pub(crate) struct RoleBinding {
    pub(crate) description: &'static str,
    pub(crate) permissions: &'static [Permission],
}

static ADMIN_PERMISSIONS: [Permission; 8] = [
    users::VIEW,
    users::CREATE,
    users::UPDATE,
    users::DELETE,
    tenants::VIEW,
    tenants::CREATE,
    tenants::UPDATE,
    tenants::DELETE,
];

static TENANT_ADMIN_PERMISSIONS: [Permission; 4] =
    [users::VIEW, users::CREATE, users::UPDATE, tenants::VIEW];

static STANDARD_USER_PERMISSIONS: [Permission; 2] = [users::VIEW, tenants::VIEW];

static ADMIN: RoleBinding = RoleBinding {
    description: "Full administrator across all tenants",
    permissions: &ADMIN_PERMISSIONS,
};

static TENANT_ADMIN: RoleBinding = RoleBinding {
    description: "Manages users within a single tenant",
    permissions: &TENANT_ADMIN_PERMISSIONS,
};

static STANDARD_USER: RoleBinding = RoleBinding {
    description: "Read-only access to users and tenants",
    permissions: &STANDARD_USER_PERMISSIONS,
};

pub(crate) fn binding(role: Role) -> &'static RoleBinding {
    match role {
        Role::Admin => &ADMIN,
        Role::TenantAdmin => &TENANT_ADMIN,
        Role::StandardUser => &STANDARD_USER,
    }
}

/// Permissions implied by a stored role name.
///
/// Total: unknown or missing roles resolve to the standard user set.
pub fn role_permissions(role: Option<&str>) -> &'static [Permission] {
    Role::from_name(role).permissions()
}

/// Every permission granted by at least one role, in catalog order.
pub fn all_permissions() -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for role in Role::ALL {
        for perm in role.permissions() {
            if !out.contains(perm) {
                out.push(perm.clone());
            }
        }
    }
    out
}

/// Role definition with its granted permissions (for listing/audit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

pub fn role_definitions() -> Vec<RoleDefinition> {
    Role::ALL
        .iter()
        .map(|role| {
            let b = binding(*role);
            RoleDefinition {
                name: role.as_str().to_string(),
                description: b.description.to_string(),
                permissions: b.permissions.iter().map(|p| p.as_str().to_string()).collect(),
            }
        })
        .collect()
}
