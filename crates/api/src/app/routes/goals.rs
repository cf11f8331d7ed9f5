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
use glowdesk_goals::{DeactivateGoal, GoalProgress, SalesGoal, SalesGoalCommand, SalesGoalId, SetGoal};
use glowdesk_infra::event_store::aggregate_types::SALES_GOAL;

use crate::app::routes::common::{CmdAuth, CommandAccepted, created_or_ok};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(set_goal).get(list_goals))
        .route("/:id/deactivate", post(deactivate_goal))
}

fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    principal: &PrincipalContext,
    agg: AggregateId,
    cmd: SalesGoalCommand,
) -> Result<CommandAccepted, axum::response::Response> {
    let cmd_auth = CmdAuth {
        inner: cmd,
        required: vec![Permission::GOALS_MANAGE],
    };
    crate::authz::authorize_command(tenant, principal, &cmd_auth).map_err(errors::forbidden)?;

    services
        .dispatch::<SalesGoal>(tenant.tenant_id(), agg, SALES_GOAL, cmd_auth.inner, |_, id| {
            SalesGoal::empty(SalesGoalId::new(id))
        })
        .map(|committed| CommandAccepted::new(agg, &committed))
        .map_err(errors::dispatch_error_to_response)
}

/// Define a goal, or redefine one when `goal_id` is given.
pub async fn set_goal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::SetGoalRequest>,
) -> axum::response::Response {
    let created = body.goal_id.is_none();
    let agg = body.goal_id.unwrap_or_else(AggregateId::new);

    let cmd = SalesGoalCommand::SetGoal(SetGoal {
        tenant_id: tenant.tenant_id(),
        goal_id: SalesGoalId::new(agg),
        name: body.name,
        target: body.target,
        start_date: body.start_date,
        end_date: body.end_date,
        position_type: body.position_type,
        user_id: body.user_id,
        store_id: body.store_id,
        occurred_at: Utc::now(),
    });

    match dispatch(&services, &tenant, &principal, agg, cmd) {
        Ok(accepted) => (created_or_ok(created), Json(accepted)).into_response(),
        Err(res) => res,
    }
}

pub async fn deactivate_goal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("goal"),
    };

    let cmd = SalesGoalCommand::DeactivateGoal(DeactivateGoal {
        tenant_id: tenant.tenant_id(),
        goal_id: SalesGoalId::new(agg),
        occurred_at: Utc::now(),
    });

    match dispatch(&services, &tenant, &principal, agg, cmd) {
        Ok(accepted) => (StatusCode::OK, Json(accepted)).into_response(),
        Err(res) => res,
    }
}

/// Goals with live progress against the sales ledger. Active only by default.
pub async fn list_goals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::GoalsQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, &Permission::GOALS_READ) {
        return errors::forbidden(e);
    }

    let tenant_id = tenant.tenant_id();
    let now = Utc::now();
    let records = services.sales.records(tenant_id);

    let goals: Vec<_> = services
        .goals
        .list(tenant_id, q.active_only.unwrap_or(true))
        .into_iter()
        .map(|goal| {
            let progress = GoalProgress::compute(&goal.criteria(), &records, now);
            dto::goal_to_json(goal, progress)
        })
        .collect();

    Json(serde_json::json!({ "goals": goals })).into_response()
}
