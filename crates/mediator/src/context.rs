use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use keystone_auth::{CurrentIdentity, CurrentUser};

/// Request-scoped context threaded through every pipeline stage.
///
/// Built once per inbound request (typically by the HTTP middleware) and
/// never mutated afterwards. Cloning is cheap.
#[derive(Clone)]
pub struct RequestContext {
    identity: Arc<dyn CurrentUser>,
    correlation_id: Uuid,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(identity: Arc<dyn CurrentUser>) -> Self {
        Self {
            identity,
            correlation_id: Uuid::now_v7(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Arc::new(CurrentIdentity::anonymous()))
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn identity(&self) -> &dyn CurrentUser {
        self.identity.as_ref()
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("user_id", &self.identity.id())
            .field("tenant_id", &self.identity.tenant_id())
            .field("authenticated", &self.identity.is_authenticated())
            .field("correlation_id", &self.correlation_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
