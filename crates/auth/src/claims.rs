use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keystone_core::{TenantId, UserId};

/// JWT claims model (transport-agnostic).
///
/// This is the set of claims Keystone expects once a token has been decoded
/// and its signature verified. Timestamps are epoch seconds as JWT requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    pub email: String,

    /// Display name of the subject.
    pub name: String,

    /// Tenant the subject belongs to.
    pub tenant_id: TenantId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Values of the user's `permission` claims at issue time.
    #[serde(default)]
    pub permissions: Vec<String>,

    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of a token's claims.
///
/// Signature verification / decoding is done by [`crate::token`]; this only
/// looks at the claims.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
