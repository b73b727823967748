//! Test doubles shared by the pipeline tests.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use keystone_auth::{CurrentIdentity, CurrentUser, Permission, RequireAuthorization};
use keystone_core::{Failure, Outcome, TenantId, UserId};

use crate::{Mediator, PipelineBehavior, PipelineError, Request, RequestContext, RequestHandler};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// No authorization requirement.
#[derive(Debug, Serialize)]
pub struct Open;

impl Request for Open {
    type Response = Outcome<String>;
}

#[derive(Debug, Serialize)]
pub struct Protected {
    #[serde(skip)]
    required: Vec<Permission>,
    pub title: String,
    #[serde(skip_serializing)]
    pub secret: String,
}

impl Protected {
    pub fn requiring(required: &[Permission]) -> Self {
        Self {
            required: required.to_vec(),
            title: "widget".to_string(),
            secret: "hunter2".to_string(),
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl RequireAuthorization for Protected {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

impl Request for Protected {
    type Response = Outcome<String>;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }

    fn validate(&self) -> Result<(), Vec<Failure>> {
        if self.title.trim().is_empty() {
            return Err(vec![Failure::new("VALIDATION_ERROR_TITLE", "title is required")]);
        }
        Ok(())
    }
}

/// Protected request whose response cannot carry failures.
#[derive(Debug, Serialize)]
pub struct PlainProtected {
    #[serde(skip)]
    required: Vec<Permission>,
}

impl PlainProtected {
    pub fn requiring(required: &[Permission]) -> Self {
        Self {
            required: required.to_vec(),
        }
    }
}

impl RequireAuthorization for PlainProtected {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

impl Request for PlainProtected {
    type Response = String;

    fn authorization(&self) -> Option<&dyn RequireAuthorization> {
        Some(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers & pipelines
// ─────────────────────────────────────────────────────────────────────────────

/// Returns a fixed response and counts invocations.
#[derive(Clone)]
pub struct CountingHandler<T> {
    response: T,
    calls: Arc<AtomicUsize>,
}

impl<T> CountingHandler<T> {
    pub fn returning(response: T) -> Self {
        Self {
            response,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R> RequestHandler<R> for CountingHandler<R::Response>
where
    R: Request,
    R::Response: Clone + Sync,
{
    async fn handle(&self, _request: R, _ctx: &RequestContext) -> Result<R::Response, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Always fails with a handler fault.
pub struct FailingHandler;

#[async_trait]
impl<R: Request> RequestHandler<R> for FailingHandler {
    async fn handle(&self, _request: R, _ctx: &RequestContext) -> Result<R::Response, PipelineError> {
        Err(anyhow::anyhow!("database unavailable").into())
    }
}

pub fn pipeline_of<R, H>(behaviors: Vec<Arc<dyn PipelineBehavior<R>>>, handler: H) -> Mediator
where
    R: Request,
    H: RequestHandler<R> + 'static,
{
    Mediator::builder().register_with::<R, H>(handler, behaviors).build()
}

// ─────────────────────────────────────────────────────────────────────────────
// Identities
// ─────────────────────────────────────────────────────────────────────────────

/// Identity double whose admin role satisfies every permission check.
pub struct AdminBypassIdentity(pub CurrentIdentity);

impl CurrentUser for AdminBypassIdentity {
    fn id(&self) -> Option<UserId> {
        self.0.id()
    }

    fn username(&self) -> Option<&str> {
        self.0.username()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.0.tenant_id()
    }

    fn role(&self) -> Option<&str> {
        self.0.role()
    }

    fn is_authenticated(&self) -> bool {
        self.0.is_authenticated()
    }

    fn permissions(&self) -> &BTreeSet<String> {
        self.0.permissions()
    }

    fn has_permissions(&self, required: &[Permission]) -> bool {
        self.is_admin() || self.0.has_permissions(required)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log capture
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedEvents {
    pub fn messages(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|e| e.message).collect()
    }

    pub fn find(&self, message: &str) -> Option<CapturedEvent> {
        self.snapshot().into_iter().find(|e| e.message == message)
    }

    pub fn contains(&self, message: &str) -> bool {
        self.find(message).is_some()
    }

    fn snapshot(&self) -> Vec<CapturedEvent> {
        self.0.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

struct CaptureLayer(CapturedEvents);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut events) = (self.0).0.lock() {
            events.push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message.unwrap_or_default(),
                fields: visitor.fields,
            });
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }
}

/// Capture events emitted on this thread until the guard drops.
///
/// Use with the default (current-thread) `#[tokio::test]` runtime.
pub fn capture_events() -> (CapturedEvents, DefaultGuard) {
    let events = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(events.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (events, guard)
}
