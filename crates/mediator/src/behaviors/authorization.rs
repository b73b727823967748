//! Authorization stage.
//!
//! Requests that expose no [`keystone_auth::RequireAuthorization`] pass
//! straight through without any log events. For the rest, the caller's
//! identity from the [`RequestContext`] is checked against the declared
//! permissions before anything downstream runs:
//!
//! - not authenticated → `Auth.Unauthorized`
//! - authenticated but missing a permission → `Auth.Forbidden`
//! - otherwise the downstream response is returned untouched
//!
//! Rejections are returned as a failed response when the response type can
//! carry failures, and raised as [`PipelineError::Authorization`] otherwise.

use async_trait::async_trait;
use tracing::{info, warn};

use keystone_auth::{AuthzError, CurrentUser, authorize};

use crate::{AuthorizationFault, Next, PipelineBehavior, PipelineError, Request, RequestContext, Response};

#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationBehavior;

#[async_trait]
impl<R: Request> PipelineBehavior<R> for AuthorizationBehavior {
    async fn handle(&self, request: R, ctx: &RequestContext, next: Next<'_, R>) -> Result<R::Response, PipelineError> {
        let name = request.name();
        let identity = ctx.identity();

        let decision = request.authorization().map(|requirement| {
            info!(request = name, correlation_id = %ctx.correlation_id(), "authorization check");
            authorize(identity, requirement.required_permissions())
        });

        match decision {
            None => next.run(request, ctx).await,
            Some(Ok(())) => {
                info!(request = name, user_id = ?identity.id(), "authorization passed");
                next.run(request, ctx).await
            }
            Some(Err(error)) => {
                log_rejection(name, identity, &error);
                reject::<R>(AuthorizationFault::new(name, error))
            }
        }
    }
}

fn log_rejection(name: &'static str, identity: &dyn CurrentUser, error: &AuthzError) {
    match error {
        AuthzError::Forbidden { required } => {
            let required: Vec<&str> = required.iter().map(|p| p.as_str()).collect();
            warn!(
                request = name,
                user_id = ?identity.id(),
                code = error.code(),
                required = ?required,
                "authorization failed"
            );
        }
        _ => warn!(request = name, code = error.code(), "authorization failed"),
    }
}

fn reject<R: Request>(fault: AuthorizationFault) -> Result<R::Response, PipelineError> {
    match R::Response::from_failures(vec![fault.to_failure()]) {
        Some(response) => Ok(response),
        None => Err(PipelineError::Authorization(fault)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keystone_auth::{CurrentIdentity, users};
    use keystone_core::{Failure, Outcome, TenantId, UserId};

    use super::*;
    use crate::testing::{
        AdminBypassIdentity, CountingHandler, Open, PlainProtected, Protected, capture_events, pipeline_of,
    };

    fn ctx(identity: impl CurrentUser + 'static) -> RequestContext {
        RequestContext::new(Arc::new(identity))
    }

    fn member(permissions: &[&str]) -> CurrentIdentity {
        CurrentIdentity::authenticated(UserId::new(), TenantId::new(), Some("StandardUser"), permissions.to_vec())
    }

    #[tokio::test]
    async fn request_without_requirement_passes_through_silently() {
        let (events, _guard) = capture_events();
        let handler = CountingHandler::returning(Outcome::success("hello".to_string()));
        let pipeline = pipeline_of::<Open, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());

        let response = pipeline.send(Open, &RequestContext::anonymous()).await.unwrap();

        assert_eq!(response, Outcome::success("hello".to_string()));
        assert_eq!(handler.calls(), 1);
        assert!(events.messages().is_empty());
    }

    #[tokio::test]
    async fn unauthenticated_caller_never_reaches_handler() {
        let (events, _guard) = capture_events();
        let handler = CountingHandler::returning(Outcome::success("created".to_string()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());

        let response = pipeline.send(Protected::requiring(&[users::CREATE]), &RequestContext::anonymous()).await.unwrap();

        assert_eq!(
            response,
            Outcome::Failure(vec![Failure::new("Auth.Unauthorized", "User is not authenticated.")])
        );
        assert_eq!(handler.calls(), 0);
        assert!(events.contains("authorization failed"));
    }

    #[tokio::test]
    async fn missing_permission_is_forbidden() {
        let (events, _guard) = capture_events();
        let handler = CountingHandler::returning(Outcome::success("created".to_string()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());

        let response = pipeline
            .send(Protected::requiring(&[users::CREATE]), &ctx(member(&["Users.View"])))
            .await
            .unwrap();

        assert_eq!(response.errors()[0].code, "Auth.Forbidden");
        assert_eq!(handler.calls(), 0);

        let failed = events.find("authorization failed").unwrap();
        assert_eq!(failed.level, tracing::Level::WARN);
        assert!(failed.fields["required"].contains("Users.Create"));
    }

    #[tokio::test]
    async fn forbidden_response_does_not_echo_held_permissions() {
        let handler = CountingHandler::returning(Outcome::success(String::new()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler);

        let response = pipeline
            .send(Protected::requiring(&[users::CREATE]), &ctx(member(&["Secret.Capability"])))
            .await
            .unwrap();

        let rendered = serde_json::to_string(&response).unwrap();
        assert!(!rendered.contains("Secret.Capability"));
    }

    #[tokio::test]
    async fn admin_role_alone_does_not_bypass_the_check() {
        let handler = CountingHandler::returning(Outcome::success(String::new()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());
        let admin = CurrentIdentity::authenticated(UserId::new(), TenantId::new(), Some("Admin"), Vec::<String>::new());

        let response = pipeline.send(Protected::requiring(&[users::DELETE]), &ctx(admin)).await.unwrap();

        assert_eq!(response.errors()[0].code, "Auth.Forbidden");
        assert_eq!(handler.calls(), 0);
    }

    #[tokio::test]
    async fn identity_granting_admin_bypass_is_forwarded() {
        let handler = CountingHandler::returning(Outcome::success("deleted".to_string()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());
        let admin = AdminBypassIdentity(CurrentIdentity::authenticated(
            UserId::new(),
            TenantId::new(),
            Some("admin"),
            Vec::<String>::new(),
        ));

        let response = pipeline.send(Protected::requiring(&[users::DELETE]), &ctx(admin)).await.unwrap();

        assert_eq!(response, Outcome::success("deleted".to_string()));
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn tenant_admin_with_create_permission_gets_handler_result_unchanged() {
        let (events, _guard) = capture_events();
        let handler = CountingHandler::returning(Outcome::success("user-42".to_string()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());
        let tenant_admin = CurrentIdentity::authenticated(
            UserId::new(),
            TenantId::new(),
            Some("TenantAdmin"),
            ["Users.View", "Users.Create", "Tenants.View"],
        );

        let response = pipeline.send(Protected::requiring(&[users::CREATE]), &ctx(tenant_admin)).await.unwrap();

        assert_eq!(response, Outcome::success("user-42".to_string()));
        assert_eq!(handler.calls(), 1);
        assert!(events.contains("authorization check"));
        assert!(events.contains("authorization passed"));
        assert!(!events.contains("authorization failed"));
    }

    #[tokio::test]
    async fn empty_requirement_admits_any_authenticated_caller() {
        let handler = CountingHandler::returning(Outcome::success(String::new()));
        let pipeline = pipeline_of::<Protected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());

        pipeline.send(Protected::requiring(&[]), &ctx(member(&[]))).await.unwrap();
        assert_eq!(handler.calls(), 1);

        let anonymous = pipeline.send(Protected::requiring(&[]), &RequestContext::anonymous()).await.unwrap();
        assert_eq!(anonymous.errors()[0].code, "Auth.Unauthorized");
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn response_without_failure_shape_escalates() {
        let handler = CountingHandler::returning("ok".to_string());
        let pipeline = pipeline_of::<PlainProtected, _>(vec![Arc::new(AuthorizationBehavior)], handler.clone());

        let err = pipeline
            .send(PlainProtected::requiring(&[users::CREATE]), &ctx(member(&[])))
            .await
            .unwrap_err();

        match err {
            PipelineError::Authorization(fault) => {
                assert_eq!(fault.code(), "Auth.Forbidden");
                assert_eq!(fault.request, "PlainProtected");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(handler.calls(), 0);
    }
}
