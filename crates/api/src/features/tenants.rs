use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use keystone_auth::{Permission, RequireAuthorization, ensure_tenant_access, tenants, users};
use keystone_core::{Failure, Outcome, TenantId};
use keystone_infra::{TenantRepository, UserRepository};
use keystone_mediator::{PipelineError, Request, RequestContext, RequestHandler};

use crate::app::dto::{TenantResponse, UserResponse};

static VIEW_TENANT_REQUIRES: [Permission; 1] = [tenants::VIEW];
static LIST_USERS_REQUIRES: [Permission; 1] = [users::VIEW];

fn tenant_not_found(id: TenantId) -> Failure {
    Failure::new("Tenant.NotFound", format!("Tenant with ID '{id}' not found."))
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTenantById {
    pub id: TenantId,
}

impl RequireAuthorization for GetTenantById {
    fn required_permissions(&self) -> &[Permission] {
        &VIEW_TENANT_REQUIRES
    }
}

impl Request for GetTenantById {
    type Response = Outcome<TenantResponse>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

pub struct GetTenantByIdHandler {
    tenants: Arc<dyn TenantRepository>,
}

impl GetTenantByIdHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>) -> Self {
        Self { tenants }
    }
}

#[async_trait]
impl RequestHandler<GetTenantById> for GetTenantByIdHandler {
    async fn handle(&self, request: GetTenantById, ctx: &RequestContext) -> Result<Outcome<TenantResponse>, PipelineError> {
        if let Err(err) = ensure_tenant_access(ctx.identity(), request.id) {
            return Ok(Outcome::failure(err.to_failure()));
        }

        Ok(match self.tenants.get_by_id(request.id).await.context("failed to load tenant")? {
            Some(tenant) => Outcome::success(TenantResponse::from(&tenant)),
            None => Outcome::failure(tenant_not_found(request.id)),
        })
    }
}

/// Users of one tenant, ordered by username.
#[derive(Debug, Clone, Serialize)]
pub struct ListTenantUsers {
    pub tenant_id: TenantId,
}

impl RequireAuthorization for ListTenantUsers {
    fn required_permissions(&self) -> &[Permission] {
        &LIST_USERS_REQUIRES
    }
}

impl Request for ListTenantUsers {
    type Response = Outcome<Vec<UserResponse>>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

pub struct ListTenantUsersHandler {
    tenants: Arc<dyn TenantRepository>,
    users: Arc<dyn UserRepository>,
}

impl ListTenantUsersHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tenants, users }
    }
}

#[async_trait]
impl RequestHandler<ListTenantUsers> for ListTenantUsersHandler {
    async fn handle(
        &self,
        request: ListTenantUsers,
        ctx: &RequestContext,
    ) -> Result<Outcome<Vec<UserResponse>>, PipelineError> {
        if let Err(err) = ensure_tenant_access(ctx.identity(), request.tenant_id) {
            return Ok(Outcome::failure(err.to_failure()));
        }
        if self.tenants.get_by_id(request.tenant_id).await.context("failed to load tenant")?.is_none() {
            return Ok(Outcome::failure(tenant_not_found(request.tenant_id)));
        }

        let users = self.users.list_by_tenant(request.tenant_id).await.context("failed to list users")?;
        Ok(Outcome::success(users.iter().map(UserResponse::from).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::Fixture;

    #[tokio::test]
    async fn members_read_their_own_tenant() {
        let fx = Fixture::new().await;
        let member = fx.user("grace@acme.test", None).await;

        let tenant = fx.send(GetTenantById { id: fx.tenant.id }, &Fixture::ctx_for(&member)).await.into_result().unwrap();
        assert_eq!(tenant.code, "ACME");
    }

    #[tokio::test]
    async fn other_tenants_are_off_limits() {
        let fx = Fixture::new().await;
        let member = fx.user("grace@acme.test", Some("TenantAdmin")).await;
        let other = fx.services.provision_tenant("Globex", "GLOBEX", "globex.test").await.unwrap();

        let outcome = fx.send(GetTenantById { id: other.id }, &Fixture::ctx_for(&member)).await;
        assert_eq!(outcome.errors()[0].code, "Auth.TenantMismatch");

        let outcome = fx.send(ListTenantUsers { tenant_id: other.id }, &Fixture::ctx_for(&member)).await;
        assert_eq!(outcome.errors()[0].code, "Auth.TenantMismatch");
    }

    #[tokio::test]
    async fn anonymous_callers_are_unauthorized() {
        let fx = Fixture::new().await;
        let outcome = fx.send(GetTenantById { id: fx.tenant.id }, &RequestContext::anonymous()).await;
        assert_eq!(outcome.errors()[0].code, "Auth.Unauthorized");
    }

    #[tokio::test]
    async fn listing_is_scoped_and_ordered() {
        let fx = Fixture::new().await;
        let caller = fx.user("zed@acme.test", None).await;
        fx.user("amy@acme.test", None).await;

        let users = fx.send(ListTenantUsers { tenant_id: fx.tenant.id }, &Fixture::ctx_for(&caller)).await;
        let names: Vec<String> = users.into_result().unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["amy@acme.test", "zed@acme.test"]);
    }
}
