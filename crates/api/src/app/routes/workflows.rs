use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use glowdesk_auth::Permission;
use glowdesk_core::AggregateId;
use glowdesk_workflows::{WorkflowRule, WorkflowRuleId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/rules", post(create_rule).get(list_rules))
        .route("/rules/:id/active", post(set_rule_active))
        .route("/scan", post(scan))
        .route("/executions", get(list_executions))
}

pub async fn create_rule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateRuleRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::WORKFLOWS_MANAGE) {
        return errors::forbidden(e);
    }

    let rule = match WorkflowRule::new(
        body.name,
        body.workflow_type,
        body.trigger_conditions,
        body.actions,
        Utc::now(),
    ) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.workflows.add_rule(tenant.tenant_id(), rule) {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(e) => errors::workflow_store_error_to_response(e),
    }
}

pub async fn list_rules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::WORKFLOWS_READ) {
        return errors::forbidden(e);
    }
    match services.workflows.rules(tenant.tenant_id()) {
        Ok(rules) => Json(serde_json::json!({ "rules": rules })).into_response(),
        Err(e) => errors::workflow_store_error_to_response(e),
    }
}

pub async fn set_rule_active(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetRuleActiveRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::WORKFLOWS_MANAGE) {
        return errors::forbidden(e);
    }
    let rule_id = match id.parse::<AggregateId>() {
        Ok(v) => WorkflowRuleId(v),
        Err(_) => return errors::invalid_id("rule"),
    };

    match services.workflows.set_active(tenant.tenant_id(), rule_id, body.is_active) {
        Ok(rule) => Json(rule).into_response(),
        Err(e) => errors::workflow_store_error_to_response(e),
    }
}

/// Run the low-stock trigger over every stock row of the business.
pub async fn scan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::WORKFLOWS_MANAGE) {
        return errors::forbidden(e);
    }

    let tenant_id = tenant.tenant_id();
    let rows = services.inventory.list(tenant_id);
    match services.monitor.scan_tenant(tenant_id, rows, Utc::now()) {
        Ok(executions) => Json(serde_json::json!({
            "executed": executions.len(),
            "executions": executions,
        }))
        .into_response(),
        Err(e) => errors::monitor_error_to_response(e),
    }
}

/// Newest first.
pub async fn list_executions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::ExecutionsQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::WORKFLOWS_READ) {
        return errors::forbidden(e);
    }
    match services.workflows.executions(tenant.tenant_id(), q.limit) {
        Ok(executions) => Json(serde_json::json!({ "executions": executions })).into_response(),
        Err(e) => errors::workflow_store_error_to_response(e),
    }
}
