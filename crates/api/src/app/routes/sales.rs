use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use glowdesk_auth::Permission;
use glowdesk_core::AggregateId;
use glowdesk_infra::event_store::aggregate_types::SALES_ORDER;
use glowdesk_sales::{
    RecordSale, SalesFilter, SalesOrder, SalesOrderCommand, SalesOrderId, SalesTotals, VoidSale,
};

use crate::app::routes::common::{CmdAuth, CommandAccepted};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/orders", post(record_sale).get(list_orders))
        .route("/orders/:id/void", post(void_sale))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RecordSaleRequest>,
) -> axum::response::Response {
    let agg = AggregateId::new();
    let now = Utc::now();

    let cmd = SalesOrderCommand::RecordSale(RecordSale {
        tenant_id: tenant.tenant_id(),
        order_id: SalesOrderId::new(agg),
        store_id: body.store_id,
        user_id: body.user_id.unwrap_or(principal.user_id()),
        sale_type: body.sale_type,
        total: body.total,
        occurred_at: body.occurred_at.unwrap_or(now),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::SALES_RECORD],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::forbidden(e);
    }

    match services.dispatch::<SalesOrder>(tenant.tenant_id(), agg, SALES_ORDER, cmd_auth.inner, |_, id| {
        SalesOrder::empty(SalesOrderId::new(id))
    }) {
        Ok(committed) => (StatusCode::CREATED, Json(CommandAccepted::new(agg, &committed))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn void_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::VoidSaleRequest>>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("order"),
    };
    let Json(body) = body.unwrap_or_default();

    let cmd = SalesOrderCommand::VoidSale(VoidSale {
        tenant_id: tenant.tenant_id(),
        order_id: SalesOrderId::new(agg),
        reason: body.reason,
        occurred_at: Utc::now(),
    });

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::SALES_VOID],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::forbidden(e);
    }

    match services.dispatch::<SalesOrder>(tenant.tenant_id(), agg, SALES_ORDER, cmd_auth.inner, |_, id| {
        SalesOrder::empty(SalesOrderId::new(id))
    }) {
        Ok(committed) => (StatusCode::OK, Json(CommandAccepted::new(agg, &committed))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Sales rows plus their totals, newest first.
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::SalesQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::SALES_READ) {
        return errors::forbidden(e);
    }

    let filter = SalesFilter {
        window: q.period.map(|p| p.window_containing(Utc::now())),
        user_id: q.user_id,
        store_id: q.store_id,
        sale_type: q.sale_type,
        include_voided: q.include_voided,
    };

    let mut orders: Vec<_> = services
        .sales
        .records(tenant.tenant_id())
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    orders.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

    let totals = SalesTotals::from_records(&orders, &filter);
    Json(dto::sales_to_json(totals, orders)).into_response()
}
