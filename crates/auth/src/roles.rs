use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role used for RBAC.
///
/// The set of roles is closed; anything a user record carries that is not a
/// known role name resolves to [`Role::StandardUser`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    TenantAdmin,
    StandardUser,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::TenantAdmin, Role::StandardUser];

    /// Resolve a stored role name (case-insensitive). Unknown or missing
    /// names fall back to the standard user role.
    pub fn from_name(name: Option<&str>) -> Role {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("admin") => Role::Admin,
            Some("tenantadmin") => Role::TenantAdmin,
            _ => Role::StandardUser,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::TenantAdmin => "TenantAdmin",
            Role::StandardUser => "StandardUser",
        }
    }

    /// Permissions granted by this role.
    pub fn permissions(&self) -> &'static [Permission] {
        crate::catalog::binding(*self).permissions
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
