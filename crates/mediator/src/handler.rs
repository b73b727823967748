use async_trait::async_trait;

use crate::{PipelineError, Request, RequestContext};

/// Terminal handler for one request type.
///
/// Expected failures (not found, conflicts) belong in the response value;
/// `Err` is for faults (storage down, bugs), usually via `anyhow`.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: R, ctx: &RequestContext) -> Result<R::Response, PipelineError>;
}
