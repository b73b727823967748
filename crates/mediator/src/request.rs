use serde::Serialize;

use keystone_auth::RequireAuthorization;
use keystone_core::{Failure, Outcome};

/// A response type that a pipeline stage may have to produce on its own.
///
/// Stages that reject a request (validation, authorization) ask the response
/// type to carry the failure. Types that cannot return `None`, and the
/// rejection is raised as a [`crate::PipelineError`] instead.
pub trait Response: Send + Sized + 'static {
    fn from_failures(failures: Vec<Failure>) -> Option<Self> {
        let _ = failures;
        None
    }
}

impl<T: Send + 'static> Response for Outcome<T> {
    fn from_failures(failures: Vec<Failure>) -> Option<Self> {
        Some(Outcome::Failure(failures))
    }
}

impl Response for () {}
impl Response for bool {}
impl Response for String {}

/// A message dispatched through the [`crate::Mediator`].
///
/// `Serialize` is required so the logging stage can render payloads; mark
/// secrets with `#[serde(skip_serializing)]`.
pub trait Request: Send + Sync + Serialize + 'static {
    type Response: Response;

    /// Short type name used in log events.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Permissions required to execute this request, if any.
    ///
    /// Requests that return `None` are reachable anonymously.
    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        None
    }

    fn validate(&self) -> Result<(), Vec<Failure>> {
        Ok(())
    }
}

/// `my_crate::users::CreateUser<Foo>` → `CreateUser`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
