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
use glowdesk_commissions::{
    ClearTiers, CommissionSummary, ReplaceTiers, RoleType, TierSchedule, TierScheduleCommand,
    next_tier, resolve_tier,
};
use glowdesk_core::UserId;
use glowdesk_infra::event_store::aggregate_types::TIER_SCHEDULE;

use crate::app::routes::common::{CmdAuth, CommandAccepted};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/tiers", get(list_tiers).put(replace_tiers))
        .route("/resolve", post(resolve))
        .route("/summary/:user_id", get(summary))
}

fn parse_role(raw: Option<String>) -> Result<Option<RoleType>, axum::response::Response> {
    raw.map(RoleType::new)
        .transpose()
        .map_err(errors::domain_error_to_response)
}

/// Replace a role's or employee's schedule in one write. Empty clears it.
pub async fn replace_tiers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ReplaceTiersRequest>,
) -> axum::response::Response {
    let tenant_id = tenant.tenant_id();
    let agg = body.scope.aggregate_id(tenant_id);
    let occurred_at = Utc::now();

    let cmd = if body.tiers.is_empty() {
        TierScheduleCommand::ClearTiers(ClearTiers {
            tenant_id,
            scope: body.scope,
            occurred_at,
        })
    } else {
        TierScheduleCommand::ReplaceTiers(ReplaceTiers {
            tenant_id,
            scope: body.scope,
            tiers: body.tiers,
            occurred_at,
        })
    };

    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::COMMISSIONS_MANAGE],
    };
    if let Err(e) = crate::authz::authorize_command(&tenant, &principal, &cmd_auth) {
        return errors::forbidden(e);
    }

    match services.dispatch::<TierSchedule>(tenant_id, agg, TIER_SCHEDULE, cmd_auth.inner, |_, id| {
        TierSchedule::empty(id)
    }) {
        Ok(committed) => (StatusCode::OK, Json(CommandAccepted::new(agg, &committed))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_tiers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::COMMISSIONS_READ) {
        return errors::forbidden(e);
    }
    let schedules = services.tiers.list(tenant.tenant_id());
    Json(serde_json::json!({ "schedules": schedules })).into_response()
}

/// Which tier a sales amount lands in, from explicit or stored tiers.
pub async fn resolve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ResolveTierRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::COMMISSIONS_READ) {
        return errors::forbidden(e);
    }

    let tiers = match body.tiers {
        Some(tiers) => tiers,
        None => {
            let role = match parse_role(body.role_type) {
                Ok(r) => r,
                Err(res) => return res,
            };
            let user = body.user_id.unwrap_or(principal.user_id());
            services.tiers.effective_for(tenant.tenant_id(), user, role.as_ref())
        }
    };

    let applied = resolve_tier(&tiers, body.current_sales);
    let next = next_tier(&tiers, body.current_sales);
    Json(dto::resolution_to_json(applied, body.current_sales, next)).into_response()
}

/// Period-to-date commission of one employee.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
    Query(q): Query<dto::SummaryQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::COMMISSIONS_READ) {
        return errors::forbidden(e);
    }
    let user_id: UserId = match user_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("user"),
    };
    let role = match parse_role(q.role_type) {
        Ok(r) => r,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    let tiers = services.tiers.effective_for(tenant_id, user_id, role.as_ref());
    let records = services.sales.records(tenant_id);
    let summary = CommissionSummary::compute(user_id, &tiers, &records, Utc::now());

    Json(summary).into_response()
}
