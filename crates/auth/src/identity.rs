//! Per-request caller identity.
//!
//! An identity is resolved once, from the verified token if there is one, and
//! then handed down the dispatch chain by reference. It never changes during
//! the request.

use std::collections::BTreeSet;

use keystone_core::{TenantId, UserId};

use crate::{Permission, Role, TokenClaims};

/// Read-only view of the caller for one request.
pub trait CurrentUser: Send + Sync {
    fn id(&self) -> Option<UserId>;

    fn username(&self) -> Option<&str>;

    fn tenant_id(&self) -> Option<TenantId>;

    fn role(&self) -> Option<&str>;

    fn is_authenticated(&self) -> bool;

    /// Permission values carried by the caller's credential.
    fn permissions(&self) -> &BTreeSet<String>;

    /// True iff every required permission is in [`CurrentUser::permissions`].
    /// An empty requirement is always satisfied.
    fn has_permissions(&self, required: &[Permission]) -> bool {
        let held = self.permissions();
        required.iter().all(|p| held.contains(p.as_str()))
    }

    /// Whether the caller's role resolves to [`Role::Admin`].
    fn is_admin(&self) -> bool {
        self.role().is_some_and(|r| Role::from_name(Some(r)).is_admin())
    }
}

/// Claims-derived identity (the production [`CurrentUser`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentIdentity {
    id: Option<UserId>,
    username: Option<String>,
    tenant_id: Option<TenantId>,
    role: Option<String>,
    authenticated: bool,
    permissions: BTreeSet<String>,
}

impl CurrentIdentity {
    /// No credential context: every field absent, not authenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Identity carried by a verified token.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            id: (!claims.sub.is_nil()).then_some(claims.sub),
            username: (!claims.name.is_empty()).then(|| claims.name.clone()),
            tenant_id: (!claims.tenant_id.is_nil()).then_some(claims.tenant_id),
            role: claims.role.clone().filter(|r| !r.is_empty()),
            authenticated: true,
            permissions: claims.permissions.iter().cloned().collect(),
        }
    }

    /// Authenticated identity assembled directly (service calls, tests).
    pub fn authenticated(
        id: UserId,
        tenant_id: TenantId,
        role: Option<&str>,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: Some(id),
            username: None,
            tenant_id: Some(tenant_id),
            role: role.map(str::to_string),
            authenticated: true,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl CurrentUser for CurrentIdentity {
    fn id(&self) -> Option<UserId> {
        self.id
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }
}
