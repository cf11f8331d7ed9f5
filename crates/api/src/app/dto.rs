use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use glowdesk_commissions::{CommissionTier, NextTier, TierScope};
use glowdesk_core::{AggregateId, StoreId, UserId};
use glowdesk_goals::{GoalProgress, GoalTarget, PositionType};
use glowdesk_infra::projections::{InventoryReadModel, SalesGoalReadModel};
use glowdesk_sales::{Period, SaleType, SalesTotals};
use glowdesk_workflows::{TriggerConditions, WorkflowAction, WorkflowType};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub store_id: StoreId,
    pub name: String,
    pub low_stock_threshold: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetThresholdRequest {
    pub low_stock_threshold: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    pub store_id: Option<StoreId>,
}

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub store_id: StoreId,
    /// Defaults to the caller.
    pub user_id: Option<UserId>,
    pub sale_type: SaleType,
    pub total: Decimal,
    /// Back-dated entry; defaults to now.
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoidSaleRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub sale_type: Option<SaleType>,
    /// Restrict to the period-to-date window.
    pub period: Option<Period>,
    #[serde(default)]
    pub include_voided: bool,
}

/// An empty `tiers` list clears the scope's schedule.
#[derive(Debug, Deserialize)]
pub struct ReplaceTiersRequest {
    pub scope: TierScope,
    pub tiers: Vec<CommissionTier>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveTierRequest {
    pub current_sales: Decimal,
    /// Explicit tiers; when absent the stored schedules of `user_id` /
    /// `role_type` are used.
    pub tiers: Option<Vec<CommissionTier>>,
    pub user_id: Option<UserId>,
    pub role_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub role_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetGoalRequest {
    /// Present to redefine an existing goal.
    pub goal_id: Option<AggregateId>,
    pub name: String,
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub position_type: Option<PositionType>,
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GoalsQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub trigger_conditions: TriggerConditions,
    pub actions: Vec<WorkflowAction>,
}

#[derive(Debug, Deserialize)]
pub struct SetRuleActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecutionsQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn inventory_to_json(rm: InventoryReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.item_id.0.to_string(),
        "store_id": rm.store_id.to_string(),
        "name": rm.name,
        "quantity_on_hand": rm.quantity_on_hand,
        "low_stock_threshold": rm.low_stock_threshold,
        "status": rm.status,
        "updated_at": rm.updated_at.to_rfc3339(),
    })
}

pub fn goal_to_json(rm: SalesGoalReadModel, progress: GoalProgress) -> serde_json::Value {
    serde_json::json!({
        "id": rm.goal_id.0.to_string(),
        "name": rm.name,
        "target": rm.target,
        "start_date": rm.start_date,
        "end_date": rm.end_date,
        "position_type": rm.position_type,
        "user_id": rm.user_id,
        "store_id": rm.store_id,
        "is_active": rm.is_active,
        "progress": progress,
    })
}

pub fn resolution_to_json(
    applied: Option<&CommissionTier>,
    current_sales: Decimal,
    next: Option<NextTier>,
) -> serde_json::Value {
    let rate = applied.map(|t| t.commission_rate).unwrap_or(Decimal::ZERO);
    serde_json::json!({
        "applied_tier": applied,
        "commission_rate": rate,
        "estimated_commission": glowdesk_commissions::estimate_commission(current_sales, rate),
        "next_tier": next,
    })
}

pub fn sales_to_json(totals: SalesTotals, orders: Vec<glowdesk_sales::SaleRecord>) -> serde_json::Value {
    serde_json::json!({
        "totals": totals,
        "count": orders.len(),
        "orders": orders,
    })
}
