use async_trait::async_trait;
use tracing::warn;
use validator::ValidationErrors;

use keystone_core::Failure;

use crate::{Next, PipelineBehavior, PipelineError, Request, RequestContext, Response};

/// Runs [`Request::validate`] and short-circuits on failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationBehavior;

#[async_trait]
impl<R: Request> PipelineBehavior<R> for ValidationBehavior {
    async fn handle(&self, request: R, ctx: &RequestContext, next: Next<'_, R>) -> Result<R::Response, PipelineError> {
        let failures = match request.validate() {
            Ok(()) => return next.run(request, ctx).await,
            Err(failures) if failures.is_empty() => return next.run(request, ctx).await,
            Err(failures) => failures,
        };

        warn!(request = request.name(), errors = failures.len(), "validation failed");

        match R::Response::from_failures(failures.clone()) {
            Some(response) => Ok(response),
            None => Err(PipelineError::Validation(failures)),
        }
    }
}

/// Convert `validator` errors into failures.
///
/// Field errors get `VALIDATION_ERROR_<FIELD>`; struct-level errors get
/// `VALIDATION_ERROR`. Output is ordered by field name.
pub fn validation_failures(errors: &ValidationErrors) -> Vec<Failure> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            let field: &str = field.as_ref();
            let code = if field == "__all__" {
                "VALIDATION_ERROR".to_string()
            } else {
                format!("VALIDATION_ERROR_{}", field.to_uppercase())
            };
            errs.iter()
                .map(|e| {
                    let message = match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("{field} is invalid ({})", e.code),
                    };
                    Failure::new(code.clone(), message)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Serialize;
    use validator::Validate;

    use keystone_core::Outcome;

    use super::*;
    use crate::testing::{CountingHandler, PlainProtected, Protected, capture_events, pipeline_of};
    use crate::{AuthorizationBehavior, LoggingBehavior, LoggingOptions};

    #[derive(Debug, Serialize, Validate)]
    struct Signup {
        #[validate(email(message = "Email must be valid"))]
        email: String,
        #[validate(length(min = 3))]
        username: String,
    }

    #[test]
    fn field_errors_become_coded_failures() {
        let errors = Signup {
            email: "nope".to_string(),
            username: "ab".to_string(),
        }
        .validate()
        .unwrap_err();

        let failures = validation_failures(&errors);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0], Failure::new("VALIDATION_ERROR_EMAIL", "Email must be valid"));
        assert_eq!(failures[1].code, "VALIDATION_ERROR_USERNAME");
        assert!(failures[1].message.contains("length"));
    }

    #[tokio::test]
    async fn invalid_request_short_circuits_before_logging_and_authorization() {
        let (events, _guard) = capture_events();
        let handler = CountingHandler::returning(Outcome::success("ok".to_string()));
        let pipeline = pipeline_of::<Protected, _>(
            vec![
                Arc::new(ValidationBehavior),
                Arc::new(LoggingBehavior::new(LoggingOptions::default())),
                Arc::new(AuthorizationBehavior),
            ],
            handler.clone(),
        );

        let response = pipeline
            .send(Protected::requiring(&[]).titled("  "), &RequestContext::anonymous())
            .await
            .unwrap();

        assert_eq!(response.errors()[0].code, "VALIDATION_ERROR_TITLE");
        assert_eq!(handler.calls(), 0);
        assert!(!events.contains("starting request"));
        assert!(!events.contains("authorization check"));
    }

    #[tokio::test]
    async fn valid_request_continues() {
        let handler = CountingHandler::returning("ok".to_string());
        let pipeline = pipeline_of::<PlainProtected, _>(vec![Arc::new(ValidationBehavior)], handler.clone());

        let response = pipeline.send(PlainProtected::requiring(&[]), &RequestContext::anonymous()).await.unwrap();

        assert_eq!(response, "ok");
        assert_eq!(handler.calls(), 1);
    }
}
