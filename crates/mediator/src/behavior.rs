use std::sync::Arc;

use async_trait::async_trait;

use crate::{PipelineError, Request, RequestContext, RequestHandler};

/// Interceptor wrapped around request dispatch.
///
/// A behavior either calls [`Next::run`] to continue down the chain or
/// returns without calling it, which short-circuits everything after it.
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    async fn handle(&self, request: R, ctx: &RequestContext, next: Next<'_, R>) -> Result<R::Response, PipelineError>;
}

/// The remainder of the pipeline after the current behavior.
pub struct Next<'a, R: Request> {
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    handler: &'a dyn RequestHandler<R>,
}

impl<'a, R: Request> Next<'a, R> {
    pub(crate) fn new(behaviors: &'a [Arc<dyn PipelineBehavior<R>>], handler: &'a dyn RequestHandler<R>) -> Self {
        Self { behaviors, handler }
    }

    /// Run the rest of the chain.
    ///
    /// The terminal handler is never invoked once the context is cancelled.
    pub async fn run(self, request: R, ctx: &RequestContext) -> Result<R::Response, PipelineError> {
        match self.behaviors.split_first() {
            Some((head, rest)) => head.handle(request, ctx, Next::new(rest, self.handler)).await,
            None => {
                if ctx.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                self.handler.handle(request, ctx).await
            }
        }
    }
}
