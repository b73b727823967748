//! Access-token issuing and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{TokenClaims, TokenValidationError, User, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Opaque value; refresh flows are not served by this backend.
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenService: Send + Sync {
    /// Issue a token carrying the user's identity and current permission claims.
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError>;

    /// Verify signature, issuer, audience and time window.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}

#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl Hs256TokenService {
    pub fn new(
        secret: impl AsRef<[u8]>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiry_minutes: i64,
    ) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime: Duration::minutes(expiry_minutes.max(1)),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        // Time window is checked against the caller-supplied clock below.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation
    }
}

impl std::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService for Hs256TokenService {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.lifetime;
        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            name: user.display_name(),
            tenant_id: user.tenant_id,
            role: user.role.clone(),
            permissions: user.permission_values().into_iter().map(str::to_string).collect(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            expires_at,
        })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation())
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use keystone_core::{Audit, TenantId, UserId};

    use super::*;
    use crate::UserClaim;
    use crate::permissions::users;

    fn service() -> Hs256TokenService {
        Hs256TokenService::new("test-secret", "keystone", "keystone-clients", 60)
    }

    fn user() -> User {
        let mut u = User::new(UserId::new(), TenantId::new(), "grace", "grace@example.com", Audit::system(Utc::now()))
            .with_role("TenantAdmin");
        u.first_name = "Grace".to_string();
        u.last_name = "Hopper".to_string();
        let now = Utc::now();
        u.claims.push(UserClaim::permission_for(&u, &users::VIEW, now));
        u.claims.push(UserClaim::permission_for(&u, &users::CREATE, now));
        u
    }

    #[test]
    fn issued_token_verifies_and_carries_identity() {
        let svc = service();
        let u = user();
        let now = Utc::now();

        let issued = svc.issue(&u, now).unwrap();
        let claims = svc.verify(&issued.access_token, now).unwrap();

        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.tenant_id, u.tenant_id);
        assert_eq!(claims.name, "Grace Hopper");
        assert_eq!(claims.role.as_deref(), Some("TenantAdmin"));
        assert_eq!(claims.permissions, vec!["Users.View".to_string(), "Users.Create".to_string()]);
        assert_eq!(issued.expires_at, now + Duration::minutes(60));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let now = Utc::now();
        let issued = Hs256TokenService::new("other", "keystone", "keystone-clients", 60).issue(&user(), now).unwrap();
        assert!(matches!(service().verify(&issued.access_token, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let now = Utc::now();
        let issued = Hs256TokenService::new("test-secret", "keystone", "someone-else", 60).issue(&user(), now).unwrap();
        assert!(matches!(service().verify(&issued.access_token, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let issued_at = Utc::now() - Duration::hours(2);
        let issued = svc.issue(&user(), issued_at).unwrap();
        assert!(matches!(
            svc.verify(&issued.access_token, Utc::now()),
            Err(TokenError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().verify("not-a-jwt", Utc::now()).is_err());
    }
}
