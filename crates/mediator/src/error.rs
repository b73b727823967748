use thiserror::Error;

use keystone_auth::AuthzError;
use keystone_core::Failure;

/// An authorization rejection that the response type could not carry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{request}: {error}")]
pub struct AuthorizationFault {
    pub request: &'static str,
    pub error: AuthzError,
}

impl AuthorizationFault {
    pub fn new(request: &'static str, error: AuthzError) -> Self {
        Self { request, error }
    }

    pub fn code(&self) -> &'static str {
        self.error.code()
    }

    pub fn to_failure(&self) -> Failure {
        self.error.to_failure()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationFault),

    #[error("validation failed ({} error(s))", .0.len())]
    Validation(Vec<Failure>),

    #[error("no handler registered for request `{0}`")]
    HandlerNotFound(&'static str),

    #[error("request was cancelled")]
    Cancelled,

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl PipelineError {
    /// Client-facing failures for this error. Handler internals are not exposed.
    pub fn failures(&self) -> Vec<Failure> {
        match self {
            PipelineError::Authorization(fault) => vec![fault.to_failure()],
            PipelineError::Validation(failures) => failures.clone(),
            PipelineError::HandlerNotFound(_) => vec![Failure::new("Pipeline.HandlerNotFound", self.to_string())],
            PipelineError::Cancelled => vec![Failure::new("Pipeline.Cancelled", self.to_string())],
            PipelineError::Handler(_) => vec![Failure::new("Internal", "An unexpected error occurred.")],
        }
    }
}
