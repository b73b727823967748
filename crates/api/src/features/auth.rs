use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use keystone_auth::{Permission, RequireAuthorization, TokenService};
use keystone_core::{Failure, Outcome, TenantId};
use keystone_infra::UserRepository;
use keystone_mediator::{PipelineError, Request, RequestContext, RequestHandler, validation_failures};

use crate::app::dto::{LoginResponse, WhoAmIResponse};

fn invalid_credentials() -> Failure {
    Failure::new("Auth.InvalidCredentials", "Invalid email or password.")
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

/// Exchange email and password for an access token. Reachable anonymously.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Login {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[serde(default, skip_serializing)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Restricts the lookup to one tenant when set.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

impl Request for Login {
    type Response = Outcome<LoginResponse>;

    fn validate(&self) -> Result<(), Vec<Failure>> {
        Validate::validate(self).map_err(|e| validation_failures(&e))
    }
}

pub struct LoginHandler {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenService>,
}

impl LoginHandler {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<dyn TokenService>) -> Self {
        Self { users, tokens }
    }
}

#[async_trait]
impl RequestHandler<Login> for LoginHandler {
    async fn handle(&self, request: Login, _ctx: &RequestContext) -> Result<Outcome<LoginResponse>, PipelineError> {
        let found = self.users.get_by_email(&request.email).await.context("failed to load user")?;
        let tenant_filter = request.tenant_id.filter(|t| !t.is_nil());

        let Some(mut user) = found.filter(|u| tenant_filter.is_none_or(|t| u.tenant_id == t)) else {
            return Ok(Outcome::failure(invalid_credentials()));
        };

        let verified = match super::verify_password(request.password, user.password_hash.clone()).await {
            Ok(verified) => verified,
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "password check failed");
                false
            }
        };
        if !verified {
            return Ok(Outcome::failure(invalid_credentials()));
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on disabled account");
            return Ok(Outcome::failure_with_code("Auth.AccountDisabled", "User account is disabled."));
        }

        let now = Utc::now();
        user.last_login_at = Some(now);
        self.users.update(&user).await.context("failed to record login")?;

        let token = self.tokens.issue(&user, now).context("failed to issue token")?;
        info!(user_id = %user.id, tenant_id = %user.tenant_id, "user logged in");

        Ok(Outcome::success(LoginResponse::new(token, &user)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WhoAmI
// ─────────────────────────────────────────────────────────────────────────────

/// Echo the caller's resolved identity. Any authenticated caller may ask.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WhoAmI;

impl RequireAuthorization for WhoAmI {
    fn required_permissions(&self) -> &[Permission] {
        &[]
    }
}

impl Request for WhoAmI {
    type Response = Outcome<WhoAmIResponse>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

#[derive(Debug, Default)]
pub struct WhoAmIHandler;

#[async_trait]
impl RequestHandler<WhoAmI> for WhoAmIHandler {
    async fn handle(&self, _request: WhoAmI, ctx: &RequestContext) -> Result<Outcome<WhoAmIResponse>, PipelineError> {
        let identity = ctx.identity();
        Ok(Outcome::success(WhoAmIResponse {
            user_id: identity.id(),
            username: identity.username().map(str::to_string),
            tenant_id: identity.tenant_id(),
            role: identity.role().map(str::to_string),
            permissions: identity.permissions().iter().cloned().collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::{Fixture, PASSWORD};

    fn login(email: &str, password: &str) -> Login {
        Login {
            email: email.to_string(),
            password: password.to_string(),
            tenant_id: None,
        }
    }

    #[tokio::test]
    async fn login_issues_token_with_synced_permissions() {
        let fx = Fixture::new().await;
        let user = fx.user("admin@acme.test", Some("TenantAdmin")).await;

        let outcome = fx.send(login("admin@acme.test", PASSWORD), &RequestContext::anonymous()).await;
        let response = outcome.into_result().unwrap();
        assert_eq!(response.user.id, user.id);

        let claims = fx.services.tokens.verify(&response.access_token, Utc::now()).unwrap();
        let mut granted = claims.permissions.clone();
        granted.sort();
        assert_eq!(granted, vec!["Tenants.View", "Users.Create", "Users.Update", "Users.View"]);

        let stored = fx.services.users.get_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let fx = Fixture::new().await;
        fx.user("grace@acme.test", None).await;

        let wrong = fx.send(login("grace@acme.test", "not-the-password"), &RequestContext::anonymous()).await;
        let unknown = fx.send(login("nobody@acme.test", PASSWORD), &RequestContext::anonymous()).await;

        assert_eq!(wrong.errors(), unknown.errors());
        assert_eq!(wrong.errors()[0].code, "Auth.InvalidCredentials");
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_log_in() {
        let fx = Fixture::new().await;
        let mut user = fx.user("off@acme.test", None).await;
        user.is_active = false;
        fx.services.users.update(&user).await.unwrap();

        let outcome = fx.send(login("off@acme.test", PASSWORD), &RequestContext::anonymous()).await;
        assert_eq!(outcome.errors()[0].code, "Auth.AccountDisabled");
    }

    #[tokio::test]
    async fn disabled_accounts_with_wrong_password_look_like_bad_credentials() {
        let fx = Fixture::new().await;
        let mut user = fx.user("off@acme.test", None).await;
        user.is_active = false;
        fx.services.users.update(&user).await.unwrap();

        let outcome = fx.send(login("off@acme.test", "definitely-wrong"), &RequestContext::anonymous()).await;
        assert_eq!(outcome.errors()[0].code, "Auth.InvalidCredentials");
    }

    #[tokio::test]
    async fn tenant_filter_must_match() {
        let fx = Fixture::new().await;
        fx.user("grace@acme.test", None).await;

        let mut request = login("grace@acme.test", PASSWORD);
        request.tenant_id = Some(TenantId::new());
        let outcome = fx.send(request, &RequestContext::anonymous()).await;
        assert_eq!(outcome.errors()[0].code, "Auth.InvalidCredentials");
    }

    #[tokio::test]
    async fn malformed_email_is_rejected_before_lookup() {
        let fx = Fixture::new().await;
        let outcome = fx.send(login("not-an-email", ""), &RequestContext::anonymous()).await;
        let codes: Vec<&str> = outcome.errors().iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["VALIDATION_ERROR_EMAIL", "VALIDATION_ERROR_PASSWORD"]);
    }

    #[tokio::test]
    async fn whoami_requires_authentication() {
        let fx = Fixture::new().await;
        let outcome = fx.send(WhoAmI, &RequestContext::anonymous()).await;
        assert_eq!(outcome.errors()[0].code, "Auth.Unauthorized");
    }

    #[tokio::test]
    async fn whoami_reflects_the_caller() {
        let fx = Fixture::new().await;
        let user = fx.user("grace@acme.test", None).await;

        let response = fx.send(WhoAmI, &Fixture::ctx_for(&user)).await.into_result().unwrap();
        assert_eq!(response.user_id, Some(user.id));
        assert_eq!(response.tenant_id, Some(fx.tenant.id));
        assert_eq!(response.permissions, vec!["Tenants.View", "Users.View"]);
    }
}
