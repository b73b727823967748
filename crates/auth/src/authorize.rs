use thiserror::Error;

use keystone_core::{Failure, TenantId};

use crate::{CurrentUser, Permission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("User is not authenticated.")]
    Unauthenticated,

    /// `required` is kept for logging only; it never goes back to the caller.
    #[error("User does not have the required permissions.")]
    Forbidden { required: Vec<Permission> },

    #[error("User does not have access to this tenant.")]
    TenantMismatch,
}

impl AuthzError {
    /// Stable error code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated => "Auth.Unauthorized",
            AuthzError::Forbidden { .. } => "Auth.Forbidden",
            AuthzError::TenantMismatch => "Auth.TenantMismatch",
        }
    }

    /// Client-facing failure: code + static message, no identity details.
    pub fn to_failure(&self) -> Failure {
        Failure::new(self.code(), self.to_string())
    }
}

/// Request-side authorization contract.
///
/// Implement this on requests that require permissions; requests without it
/// are reachable anonymously.
pub trait RequireAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize an identity against a list of required permissions.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize<U>(identity: &U, required: &[Permission]) -> Result<(), AuthzError>
where
    U: CurrentUser + ?Sized,
{
    if !identity.is_authenticated() {
        return Err(AuthzError::Unauthenticated);
    }

    if !required.is_empty() && !identity.has_permissions(required) {
        return Err(AuthzError::Forbidden {
            required: required.to_vec(),
        });
    }

    Ok(())
}

/// Tenant isolation for handlers that load another user's data.
///
/// Admins may act across tenants; everyone else only within their own.
pub fn ensure_tenant_access<U>(identity: &U, tenant_id: TenantId) -> Result<(), AuthzError>
where
    U: CurrentUser + ?Sized,
{
    if identity.is_admin() || identity.tenant_id() == Some(tenant_id) {
        Ok(())
    } else {
        Err(AuthzError::TenantMismatch)
    }
}

#[cfg(test)]
mod tests {
    use keystone_core::UserId;

    use super::*;
    use crate::CurrentIdentity;
    use crate::permissions::users;

    #[test]
    fn anonymous_caller_is_unauthenticated() {
        let err = authorize(&CurrentIdentity::anonymous(), &[users::VIEW]).unwrap_err();
        assert_eq!(err, AuthzError::Unauthenticated);
        assert_eq!(err.code(), "Auth.Unauthorized");
    }

    #[test]
    fn anonymous_caller_is_rejected_even_with_empty_requirement() {
        assert_eq!(authorize(&CurrentIdentity::anonymous(), &[]), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let identity = CurrentIdentity::authenticated(UserId::new(), TenantId::new(), None, ["Users.View"]);
        let err = authorize(&identity, &[users::CREATE]).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden { required: vec![users::CREATE] });
        assert_eq!(err.to_failure().code, "Auth.Forbidden");
    }

    #[test]
    fn forbidden_failure_does_not_leak_held_permissions() {
        let identity = CurrentIdentity::authenticated(UserId::new(), TenantId::new(), None, ["Secret.Thing"]);
        let failure = authorize(&identity, &[users::CREATE]).unwrap_err().to_failure();
        assert!(!failure.message.contains("Secret.Thing"));
        assert!(!failure.message.contains("Users.Create"));
    }

    #[test]
    fn satisfied_requirement_passes() {
        let identity =
            CurrentIdentity::authenticated(UserId::new(), TenantId::new(), None, ["Users.View", "Users.Create"]);
        assert_eq!(authorize(&identity, &[users::CREATE]), Ok(()));
        assert_eq!(authorize(&identity, &[]), Ok(()));
    }

    #[test]
    fn tenant_access_is_limited_to_own_tenant_for_non_admins() {
        let own = TenantId::new();
        let identity = CurrentIdentity::authenticated(UserId::new(), own, Some("TenantAdmin"), Vec::<String>::new());
        assert_eq!(ensure_tenant_access(&identity, own), Ok(()));
        assert_eq!(ensure_tenant_access(&identity, TenantId::new()), Err(AuthzError::TenantMismatch));
    }

    #[test]
    fn admins_cross_tenants() {
        let identity =
            CurrentIdentity::authenticated(UserId::new(), TenantId::new(), Some("admin"), Vec::<String>::new());
        assert_eq!(ensure_tenant_access(&identity, TenantId::new()), Ok(()));
    }
}
