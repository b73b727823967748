//! `keystone-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows the
//! permission catalog, how a verified token becomes a per-request identity,
//! and how an identity is checked against a request's requirements.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod identity;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod tenant;
pub mod token;
pub mod user;

pub use authorize::{AuthzError, RequireAuthorization, authorize, ensure_tenant_access};
pub use catalog::{RoleDefinition, all_permissions, role_definitions, role_permissions};
pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use identity::{CurrentIdentity, CurrentUser};
pub use permissions::{PERMISSION_CLAIM_TYPE, Permission, tenants, users};
pub use roles::Role;
pub use tenant::Tenant;
pub use token::{Hs256TokenService, IssuedToken, TokenError, TokenService};
pub use user::{User, UserClaim};
