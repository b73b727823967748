//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, token service and the mediator with its handlers
//! - `routes/`: HTTP handlers that turn a request into a mediator message
//! - `dto.rs`: response DTOs and their mapping from domain records
//! - `errors.rs`: failure codes to HTTP statuses, one JSON error shape

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use keystone_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services)))
}

/// Router over already-wired services.
pub fn router(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens.clone(),
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(auth_state, middleware::request_context))
                .layer(Extension(services)),
        )
}
