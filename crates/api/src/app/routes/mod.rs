use axum::{routing::get, Router};

pub mod commissions;
pub mod common;
pub mod goals;
pub mod inventory;
pub mod outbox;
pub mod sales;
pub mod system;
pub mod workflows;

/// Router for all authenticated (business-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/notifications", get(outbox::notifications))
        .route("/purchase-requests", get(outbox::purchase_requests))
        .nest("/inventory", inventory::router())
        .nest("/sales", sales::router())
        .nest("/commissions", commissions::router())
        .nest("/goals", goals::router())
        .nest("/workflows", workflows::router())
}
