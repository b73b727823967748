use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Claim type under which permissions are stored on a user.
pub const PERMISSION_CLAIM_TYPE: &str = "permission";

/// Permission identifier.
///
/// Permissions are opaque `Resource.Action` strings (e.g. "Users.View").
/// Nothing parses the structure; equality is exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// User management permissions.
pub mod users {
    use super::Permission;

    pub const VIEW: Permission = Permission::from_static("Users.View");
    pub const CREATE: Permission = Permission::from_static("Users.Create");
    pub const UPDATE: Permission = Permission::from_static("Users.Update");
    pub const DELETE: Permission = Permission::from_static("Users.Delete");
}

/// Tenant management permissions.
pub mod tenants {
    use super::Permission;

    pub const VIEW: Permission = Permission::from_static("Tenants.View");
    pub const CREATE: Permission = Permission::from_static("Tenants.Create");
    pub const UPDATE: Permission = Permission::from_static("Tenants.Update");
    pub const DELETE: Permission = Permission::from_static("Tenants.Delete");
}
