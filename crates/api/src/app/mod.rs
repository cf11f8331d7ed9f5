//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: event store, dispatcher, read models, workflow runtime, workers
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::context::TenantContext;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, ServicesError};

/// Build the full HTTP router.
pub async fn build_app(config: ApiConfig) -> Result<Router, ServicesError> {
    build_app_with_services(config).await.map(|(app, _)| app)
}

/// Build the router and hand back the services so the caller can stop
/// their workers on shutdown.
pub async fn build_app_with_services(config: ApiConfig) -> Result<(Router, Arc<AppServices>), ServicesError> {
    let jwt = Arc::new(glowdesk_auth::Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(&config).await?);

    // Auth runs first; warm-up needs both the tenant and the services.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware))
            .layer(Extension(services.clone()))
            .layer(axum::middleware::from_fn(warm_tenant)),
    );

    let app = Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected);

    Ok((app, services))
}

/// Load the caller's business into the read models before the handler runs.
async fn warm_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    req: Request,
    next: Next,
) -> Response {
    services.ensure_tenant_loaded(tenant.tenant_id());
    next.run(req).await
}
