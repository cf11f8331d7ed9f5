use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use glowdesk_auth::Permission;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

/// Notifications produced by workflow actions, newest first.
pub async fn notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::WORKFLOWS_READ) {
        return errors::forbidden(e);
    }
    let notifications = services.outboxes.notifications.list(tenant.tenant_id());
    Json(serde_json::json!({ "notifications": notifications })).into_response()
}

/// Reorder requests queued by `create_purchase_order` actions.
pub async fn purchase_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::INVENTORY_READ) {
        return errors::forbidden(e);
    }
    let requests = services.outboxes.purchase_requests.list(tenant.tenant_id());
    Json(serde_json::json!({ "purchase_requests": requests })).into_response()
}
