//! Process configuration read from environment variables.
//!
//! | Variable             | Default              |
//! |----------------------|----------------------|
//! | `BIND_ADDR`          | `0.0.0.0:8080`       |
//! | `JWT_SECRET`         | insecure dev secret  |
//! | `JWT_ISSUER`         | `keystone`           |
//! | `JWT_AUDIENCE`       | `keystone-clients`   |
//! | `JWT_EXPIRY_MINUTES` | `60`                 |
//! | `DATABASE_URL`       | unset (in-memory)    |
//! | `LOG_PAYLOADS`       | `false`              |
//! | `MAX_PAYLOAD_SIZE`   | `10000`              |
//! | `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD` | unset |
//!
//! The bootstrap pair must be given together. When present, startup creates a
//! default tenant and an `Admin` user with these credentials if the email is
//! not already registered.

use std::net::SocketAddr;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// First administrator created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    /// `None` runs against in-memory stores.
    pub database_url: Option<String>,
    pub log_payloads: bool,
    pub max_payload_size: usize,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests, embedding).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    var: "BOOTSTRAP_ADMIN_PASSWORD",
                    reason: "required when BOOTSTRAP_ADMIN_EMAIL is set".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    var: "BOOTSTRAP_ADMIN_EMAIL",
                    reason: "required when BOOTSTRAP_ADMIN_PASSWORD is set".to_string(),
                });
            }
        };

        Ok(Self {
            bind_addr: parse(get("BIND_ADDR"), "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            jwt_secret,
            jwt_issuer: get("JWT_ISSUER").unwrap_or_else(|| "keystone".to_string()),
            jwt_audience: get("JWT_AUDIENCE").unwrap_or_else(|| "keystone-clients".to_string()),
            jwt_expiry_minutes: parse(get("JWT_EXPIRY_MINUTES"), "JWT_EXPIRY_MINUTES", 60)?,
            database_url: get("DATABASE_URL"),
            log_payloads: parse(get("LOG_PAYLOADS"), "LOG_PAYLOADS", false)?,
            max_payload_size: parse(get("MAX_PAYLOAD_SIZE"), "MAX_PAYLOAD_SIZE", 10_000)?,
            bootstrap_admin,
        })
    }

    /// True when `JWT_SECRET` was absent and the dev fallback is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_expiry_minutes", &self.jwt_expiry_minutes)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("log_payloads", &self.log_payloads)
            .field("max_payload_size", &self.max_payload_size)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish()
    }
}

fn parse<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("{raw:?}: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(cfg.uses_dev_secret());
        assert_eq!(cfg.jwt_expiry_minutes, 60);
        assert!(cfg.database_url.is_none());
        assert!(!cfg.log_payloads);
        assert_eq!(cfg.max_payload_size, 10_000);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/keystone"),
            ("LOG_PAYLOADS", "true"),
            ("MAX_PAYLOAD_SIZE", "512"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert!(!cfg.uses_dev_secret());
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/keystone"));
        assert!(cfg.log_payloads);
        assert_eq!(cfg.max_payload_size, 512);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "   ")]).unwrap();
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = config(&[("JWT_EXPIRY_MINUTES", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRY_MINUTES", .. }));
    }

    #[test]
    fn bootstrap_admin_needs_both_values() {
        let err = config(&[("BOOTSTRAP_ADMIN_EMAIL", "root@example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BOOTSTRAP_ADMIN_PASSWORD", .. }));

        let cfg = config(&[
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "correct horse"),
        ])
        .unwrap();
        assert_eq!(cfg.bootstrap_admin.map(|b| b.email).as_deref(), Some("root@example.com"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://u:pw@h/db"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "correct horse"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("pw@h"));
        assert!(!rendered.contains("correct horse"));
    }
}
