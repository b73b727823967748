//! `keystone-mediator`: in-process request dispatch with a behavior pipeline.
//!
//! Every request type is registered once with its terminal handler and an
//! ordered chain of [`PipelineBehavior`]s. Dispatch walks that chain:
//!
//! ```text
//! send(request, ctx)
//!   ↓
//! Validation     (short-circuits on invalid input)
//!   ↓
//! Logging        (start / completion / failure events)
//!   ↓
//! Authorization  (rejects before the handler runs)
//!   ↓
//! RequestHandler
//! ```
//!
//! The caller's identity is not ambient: it travels in the [`RequestContext`]
//! handed to every stage.

pub mod behavior;
pub mod behaviors;
pub mod context;
pub mod error;
pub mod handler;
pub mod mediator;
pub mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use behavior::{Next, PipelineBehavior};
pub use behaviors::{
    AuthorizationBehavior, LoggingBehavior, LoggingOptions, ValidationBehavior, validation_failures,
};
pub use context::RequestContext;
pub use error::{AuthorizationFault, PipelineError};
pub use handler::RequestHandler;
pub use mediator::{Mediator, MediatorBuilder, MediatorOptions};
pub use request::{Request, Response, short_type_name};
