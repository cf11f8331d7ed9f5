use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use glowdesk_auth::Permission;
use glowdesk_core::AggregateId;
use glowdesk_infra::event_store::aggregate_types::INVENTORY_ITEM;
use glowdesk_inventory::{
    AdjustStock, CreateItem, InventoryCommand, InventoryItem, InventoryItemId, SetThreshold,
};

use crate::app::routes::common::{CmdAuth, CommandAccepted};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/items", post(create_item))
        .route("/items/:id", get(get_item))
        .route("/items/:id/adjust", post(adjust_stock))
        .route("/items/:id/threshold", put(set_threshold))
        .route("/low-stock", get(low_stock))
}

fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    principal: &PrincipalContext,
    agg: AggregateId,
    cmd: InventoryCommand,
) -> Result<CommandAccepted, axum::response::Response> {
    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::INVENTORY_WRITE],
    };
    crate::authz::authorize_command(tenant, principal, &cmd_auth).map_err(errors::forbidden)?;

    services
        .dispatch::<InventoryItem>(tenant.tenant_id(), agg, INVENTORY_ITEM, cmd_auth.inner, |_, id| {
            InventoryItem::empty(InventoryItemId::new(id))
        })
        .map(|committed| CommandAccepted::new(agg, &committed))
        .map_err(errors::dispatch_error_to_response)
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    let agg = AggregateId::new();

    let cmd = InventoryCommand::CreateItem(CreateItem {
        tenant_id: tenant.tenant_id(),
        item_id: InventoryItemId::new(agg),
        store_id: body.store_id,
        name: body.name,
        low_stock_threshold: body.low_stock_threshold,
        occurred_at: Utc::now(),
    });

    match dispatch(&services, &tenant, &principal, agg, cmd) {
        Ok(accepted) => (StatusCode::CREATED, Json(accepted)).into_response(),
        Err(res) => res,
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };

    let cmd = InventoryCommand::AdjustStock(AdjustStock {
        tenant_id: tenant.tenant_id(),
        item_id: InventoryItemId::new(agg),
        delta: body.delta,
        occurred_at: Utc::now(),
    });

    match dispatch(&services, &tenant, &principal, agg, cmd) {
        Ok(accepted) => (StatusCode::OK, Json(accepted)).into_response(),
        Err(res) => res,
    }
}

pub async fn set_threshold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetThresholdRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };

    let cmd = InventoryCommand::SetThreshold(SetThreshold {
        tenant_id: tenant.tenant_id(),
        item_id: InventoryItemId::new(agg),
        low_stock_threshold: body.low_stock_threshold,
        occurred_at: Utc::now(),
    });

    match dispatch(&services, &tenant, &principal, agg, cmd) {
        Ok(accepted) => (StatusCode::OK, Json(accepted)).into_response(),
        Err(res) => res,
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::INVENTORY_READ) {
        return errors::forbidden(e);
    }
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };

    match services.inventory.get(tenant.tenant_id(), &InventoryItemId::new(agg)) {
        Some(rm) => (StatusCode::OK, Json(dto::inventory_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
    }
}

/// Items at or below their threshold, optionally for one store.
pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::LowStockQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::INVENTORY_READ) {
        return errors::forbidden(e);
    }

    let items: Vec<_> = services
        .inventory
        .low_stock(tenant.tenant_id(), q.store_id)
        .into_iter()
        .map(dto::inventory_to_json)
        .collect();

    Json(serde_json::json!({ "count": items.len(), "items": items })).into_response()
}
