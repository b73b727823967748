use async_trait::async_trait;
use serde::Serialize;

use keystone_auth::{Permission, RequireAuthorization, RoleDefinition, all_permissions, role_definitions, users};
use keystone_core::Outcome;
use keystone_mediator::{PipelineError, Request, RequestContext, RequestHandler};

static LIST_CATALOG_REQUIRES: [Permission; 1] = [users::VIEW];

/// The role catalog with the permissions each role grants.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListRoles;

impl RequireAuthorization for ListRoles {
    fn required_permissions(&self) -> &[Permission] {
        &LIST_CATALOG_REQUIRES
    }
}

impl Request for ListRoles {
    type Response = Outcome<Vec<RoleDefinition>>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

#[derive(Debug, Default)]
pub struct ListRolesHandler;

#[async_trait]
impl RequestHandler<ListRoles> for ListRolesHandler {
    async fn handle(&self, _request: ListRoles, _ctx: &RequestContext) -> Result<Outcome<Vec<RoleDefinition>>, PipelineError> {
        Ok(Outcome::success(role_definitions()))
    }
}

/// Every permission some role grants, for building assignment screens.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListPermissions;

impl RequireAuthorization for ListPermissions {
    fn required_permissions(&self) -> &[Permission] {
        &LIST_CATALOG_REQUIRES
    }
}

impl Request for ListPermissions {
    type Response = Outcome<Vec<String>>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

#[derive(Debug, Default)]
pub struct ListPermissionsHandler;

#[async_trait]
impl RequestHandler<ListPermissions> for ListPermissionsHandler {
    async fn handle(&self, _request: ListPermissions, _ctx: &RequestContext) -> Result<Outcome<Vec<String>>, PipelineError> {
        Ok(Outcome::success(all_permissions().iter().map(|p| p.as_str().to_string()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::Fixture;

    #[tokio::test]
    async fn catalog_is_listed_in_role_order() {
        let fx = Fixture::new().await;
        let member = fx.user("grace@acme.test", None).await;

        let roles = fx.send(ListRoles, &Fixture::ctx_for(&member)).await.into_result().unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Admin", "TenantAdmin", "StandardUser"]);
        assert_eq!(roles[2].permissions, vec!["Users.View", "Tenants.View"]);
    }

    #[tokio::test]
    async fn anonymous_callers_cannot_list_roles() {
        let fx = Fixture::new().await;
        let outcome = fx.send(ListRoles, &RequestContext::anonymous()).await;
        assert_eq!(outcome.errors()[0].code, "Auth.Unauthorized");
    }

    #[tokio::test]
    async fn permission_listing_is_the_deduplicated_union() {
        let fx = Fixture::new().await;
        let member = fx.user("grace@acme.test", None).await;

        let listed = fx.send(ListPermissions, &Fixture::ctx_for(&member)).await.into_result().unwrap();
        assert_eq!(
            listed,
            vec![
                "Users.View",
                "Users.Create",
                "Users.Update",
                "Users.Delete",
                "Tenants.View",
                "Tenants.Create",
                "Tenants.Update",
                "Tenants.Delete",
            ]
        );
    }
}
