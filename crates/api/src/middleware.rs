use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, debug};
use uuid::Uuid;

use keystone_auth::{CurrentIdentity, CurrentUser, TokenService};
use keystone_mediator::RequestContext;
use keystone_observability::request_span;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenService>,
}

/// Resolve the caller and attach a [`RequestContext`] to the request.
///
/// This never rejects. A missing or invalid bearer token yields the anonymous
/// identity and the authorization stage decides what that caller may do.
pub async fn request_context(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let correlation_id = correlation_id(req.headers());
    let span = request_span(correlation_id, req.method().as_str(), req.uri().path());

    let identity = resolve_identity(state.tokens.as_ref(), req.headers());
    let ctx = RequestContext::new(identity).with_correlation_id(correlation_id);
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

fn resolve_identity(tokens: &dyn TokenService, headers: &HeaderMap) -> Arc<dyn CurrentUser> {
    let Some(token) = extract_bearer(headers) else {
        return Arc::new(CurrentIdentity::anonymous());
    };

    match tokens.verify(token, Utc::now()) {
        Ok(claims) => Arc::new(CurrentIdentity::from_claims(&claims)),
        Err(err) => {
            debug!(error = %err, "bearer token rejected");
            Arc::new(CurrentIdentity::anonymous())
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Caller-supplied correlation id, or a fresh one when absent or malformed.
fn correlation_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .unwrap_or_else(Uuid::now_v7)
}
