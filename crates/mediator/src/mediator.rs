use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    AuthorizationBehavior, LoggingBehavior, LoggingOptions, Next, PipelineBehavior, PipelineError, Request,
    RequestContext, RequestHandler, ValidationBehavior, short_type_name,
};

/// Which standard behaviors [`MediatorBuilder::register`] attaches.
///
/// Authorization is always attached.
#[derive(Debug, Clone)]
pub struct MediatorOptions {
    pub use_validation: bool,
    pub use_logging: bool,
    pub logging: LoggingOptions,
}

impl Default for MediatorOptions {
    fn default() -> Self {
        Self {
            use_validation: true,
            use_logging: true,
            logging: LoggingOptions::default(),
        }
    }
}

struct Pipeline<R: Request> {
    behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
    handler: Arc<dyn RequestHandler<R>>,
}

/// Routes each request to the pipeline registered for its type.
pub struct Mediator {
    pipelines: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new(MediatorOptions::default())
    }

    pub fn is_registered<R: Request>(&self) -> bool {
        self.pipelines.contains_key(&TypeId::of::<R>())
    }

    /// Dispatch `request` through its behaviors and handler.
    pub async fn send<R: Request>(&self, request: R, ctx: &RequestContext) -> Result<R::Response, PipelineError> {
        let pipeline = self
            .pipelines
            .get(&TypeId::of::<R>())
            .and_then(|p| p.downcast_ref::<Pipeline<R>>())
            .ok_or(PipelineError::HandlerNotFound(short_type_name::<R>()))?;

        Next::new(&pipeline.behaviors, pipeline.handler.as_ref()).run(request, ctx).await
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator").field("pipelines", &self.pipelines.len()).finish()
    }
}

pub struct MediatorBuilder {
    options: MediatorOptions,
    pipelines: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MediatorBuilder {
    pub fn new(options: MediatorOptions) -> Self {
        Self {
            options,
            pipelines: HashMap::new(),
        }
    }

    /// Register `handler` behind the standard chain:
    /// validation → logging → authorization → handler.
    pub fn register<R, H>(self, handler: H) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let mut behaviors: Vec<Arc<dyn PipelineBehavior<R>>> = Vec::with_capacity(3);
        if self.options.use_validation {
            behaviors.push(Arc::new(ValidationBehavior));
        }
        if self.options.use_logging {
            behaviors.push(Arc::new(LoggingBehavior::new(self.options.logging.clone())));
        }
        behaviors.push(Arc::new(AuthorizationBehavior));

        self.register_with(handler, behaviors)
    }

    /// Register `handler` behind an explicit behavior chain (outermost first).
    ///
    /// Registering the same request type twice replaces the earlier pipeline.
    pub fn register_with<R, H>(mut self, handler: H, behaviors: Vec<Arc<dyn PipelineBehavior<R>>>) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let pipeline = Pipeline::<R> {
            behaviors,
            handler: Arc::new(handler),
        };
        self.pipelines.insert(TypeId::of::<R>(), Box::new(pipeline));
        self
    }

    pub fn build(self) -> Mediator {
        Mediator {
            pipelines: self.pipelines,
        }
    }
}
