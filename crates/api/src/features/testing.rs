//! Shared fixtures for feature tests: in-memory services with one tenant.

use std::sync::Arc;

use keystone_auth::{CurrentIdentity, Hs256TokenService, Tenant, User};
use keystone_mediator::{MediatorOptions, Request, RequestContext};

use crate::app::services::AppServices;

pub const PASSWORD: &str = "correct-horse-battery";

pub struct Fixture {
    pub services: AppServices,
    pub tenant: Tenant,
}

impl Fixture {
    pub async fn new() -> Self {
        let tokens = Arc::new(Hs256TokenService::new("test-secret", "keystone", "keystone-clients", 60));
        let services = AppServices::in_memory(tokens, MediatorOptions::default());
        let tenant = services.provision_tenant("Acme", "ACME", "acme.test").await.unwrap();
        Self { services, tenant }
    }

    /// A user in the fixture tenant, with permissions synced from `role`.
    pub async fn user(&self, email: &str, role: Option<&str>) -> User {
        self.services.provision_user(self.tenant.id, email, PASSWORD, role).await.unwrap()
    }

    /// Context carrying the identity a login token for `user` would produce.
    pub fn ctx_for(user: &User) -> RequestContext {
        let identity =
            CurrentIdentity::authenticated(user.id, user.tenant_id, user.role.as_deref(), user.permission_values())
                .with_username(user.username.clone());
        RequestContext::new(Arc::new(identity))
    }

    pub async fn send<R: Request>(&self, request: R, ctx: &RequestContext) -> R::Response {
        self.services.mediator.send(request, ctx).await.unwrap()
    }
}
