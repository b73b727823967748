//! User entity and the claims attached to it.
//!
//! A user belongs to exactly one tenant and owns its claims: claims are
//! created and removed only through the user, and go away with it.

use chrono::{DateTime, Utc};

use keystone_core::{Audit, ClaimId, TenantId, UserId};

use crate::{PERMISSION_CLAIM_TYPE, Permission, Role};

// ─────────────────────────────────────────────────────────────────────────────
// User Claim
// ─────────────────────────────────────────────────────────────────────────────

/// A typed key/value fact attached to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaim {
    pub id: ClaimId,
    pub user_id: UserId,
    pub claim_type: String,
    pub claim_value: String,
    pub audit: Audit,
}

impl UserClaim {
    pub fn new(user_id: UserId, claim_type: impl Into<String>, claim_value: impl Into<String>, audit: Audit) -> Self {
        Self {
            id: ClaimId::new(),
            user_id,
            claim_type: claim_type.into(),
            claim_value: claim_value.into(),
            audit,
        }
    }

    /// A `permission` claim attributed to the same creator as `user`.
    pub fn permission_for(user: &User, permission: &Permission, at: DateTime<Utc>) -> Self {
        Self::new(
            user.id,
            PERMISSION_CLAIM_TYPE,
            permission.as_str(),
            Audit::created_by(user.audit.created_by_id, user.audit.created_by_name.clone(), at),
        )
    }

    pub fn is_permission(&self) -> bool {
        self.claim_type == PERMISSION_CLAIM_TYPE
    }

    pub fn is_permission_value(&self, value: &str) -> bool {
        self.is_permission() && self.claim_value == value
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub email_confirmed: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Stored role name; resolved through [`Role::from_name`].
    pub role: Option<String>,
    /// Ordered claim collection.
    pub claims: Vec<UserClaim>,
    pub audit: Audit,
}

impl User {
    pub fn new(
        id: UserId,
        tenant_id: TenantId,
        username: impl Into<String>,
        email: impl Into<String>,
        audit: Audit,
    ) -> Self {
        Self {
            id,
            tenant_id,
            first_name: String::new(),
            last_name: String::new(),
            email: email.into(),
            username: username.into(),
            password_hash: String::new(),
            phone_number: None,
            is_active: true,
            email_confirmed: false,
            last_login_at: None,
            role: None,
            claims: Vec::new(),
            audit,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Role the stored role name resolves to.
    pub fn resolved_role(&self) -> Role {
        Role::from_name(self.role.as_deref())
    }

    pub fn permission_claims(&self) -> impl Iterator<Item = &UserClaim> {
        self.claims.iter().filter(|c| c.is_permission())
    }

    pub fn permission_values(&self) -> Vec<&str> {
        self.permission_claims().map(|c| c.claim_value.as_str()).collect()
    }

    pub fn has_permission_claim(&self, permission: &str) -> bool {
        self.claims.iter().any(|c| c.is_permission_value(permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::users;

    fn user() -> User {
        User::new(UserId::new(), TenantId::new(), "ada", "ada@example.com", Audit::system(Utc::now()))
    }

    #[test]
    fn permission_claims_ignore_other_types() {
        let mut u = user();
        let now = Utc::now();
        u.claims.push(UserClaim::new(u.id, "department", "Users.View", Audit::system(now)));
        u.claims.push(UserClaim::permission_for(&u, &users::VIEW, now));

        assert_eq!(u.permission_values(), vec!["Users.View"]);
        assert_eq!(u.permission_claims().count(), 1);
    }

    #[test]
    fn permission_claim_inherits_user_attribution() {
        let creator = UserId::new();
        let mut u = user();
        u.audit = Audit::created_by(creator, Some("root".to_string()), Utc::now());

        let claim = UserClaim::permission_for(&u, &users::CREATE, Utc::now());
        assert_eq!(claim.audit.created_by_id, creator);
        assert_eq!(claim.audit.created_by_name.as_deref(), Some("root"));
        assert_eq!(claim.user_id, u.id);
    }

    #[test]
    fn display_name_trims_missing_parts() {
        let mut u = user();
        u.first_name = "Ada".to_string();
        assert_eq!(u.display_name(), "Ada");
        u.last_name = "Lovelace".to_string();
        assert_eq!(u.display_name(), "Ada Lovelace");
    }

    #[test]
    fn resolved_role_defaults_to_standard_user() {
        assert_eq!(user().resolved_role(), Role::StandardUser);
        assert_eq!(user().with_role("admin").resolved_role(), Role::Admin);
    }
}
