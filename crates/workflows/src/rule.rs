//! Workflow rules and rule selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glowdesk_core::{AggregateId, DomainError, Entity, StoreId, TenantId};
use glowdesk_inventory::{InventoryItemId, StockStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowRuleId(pub AggregateId);

impl WorkflowRuleId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for WorkflowRuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for WorkflowRuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Which stock condition a rule responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// Quantity at or below the threshold.
    StockAlert,
    /// Quantity at zero.
    EmergencyRestock,
}

impl WorkflowType {
    /// Workflow type a stock status calls for; `None` when in stock.
    pub fn for_status(status: StockStatus) -> Option<Self> {
        match status {
            StockStatus::InStock => None,
            StockStatus::LowStock => Some(WorkflowType::StockAlert),
            StockStatus::OutOfStock => Some(WorkflowType::EmergencyRestock),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::StockAlert => "stock_alert",
            WorkflowType::EmergencyRestock => "emergency_restock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    CreatePurchaseOrder,
    SendNotification,
    NotifyManager,
    EmailManager,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::CreatePurchaseOrder => "create_purchase_order",
            WorkflowAction::SendNotification => "send_notification",
            WorkflowAction::NotifyManager => "notify_manager",
            WorkflowAction::EmailManager => "email_manager",
        }
    }
}

/// Narrowing conditions. Empty conditions match every item of the business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConditions {
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub item_ids: Vec<InventoryItemId>,
}

impl TriggerConditions {
    pub fn accepts(&self, snapshot: &StockSnapshot) -> bool {
        if self.store_id.is_some_and(|s| s != snapshot.store_id) {
            return false;
        }
        self.item_ids.is_empty() || self.item_ids.contains(&snapshot.item_id)
    }
}

/// Point-in-time view of one item's stock, as seen by the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub store_id: StoreId,
    pub name: String,
    pub quantity_on_hand: i64,
    pub low_stock_threshold: i64,
}

impl StockSnapshot {
    pub fn status(&self) -> StockStatus {
        StockStatus::classify(self.quantity_on_hand, self.low_stock_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRule {
    pub rule_id: WorkflowRuleId,
    pub name: String,
    pub workflow_type: WorkflowType,
    pub trigger_conditions: TriggerConditions,
    pub actions: Vec<WorkflowAction>,
    pub is_active: bool,
    pub execution_count: u64,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRule {
    /// New active rule. Needs a name and at least one action.
    pub fn new(
        name: impl Into<String>,
        workflow_type: WorkflowType,
        trigger_conditions: TriggerConditions,
        actions: Vec<WorkflowAction>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("rule name cannot be empty"));
        }
        if actions.is_empty() {
            return Err(DomainError::validation("rule needs at least one action"));
        }

        Ok(Self {
            rule_id: WorkflowRuleId::new(),
            name,
            workflow_type,
            trigger_conditions,
            actions,
            is_active: true,
            execution_count: 0,
            created_at,
        })
    }

    pub fn handles(&self, workflow_type: WorkflowType, snapshot: &StockSnapshot) -> bool {
        self.is_active
            && self.workflow_type == workflow_type
            && self.trigger_conditions.accepts(snapshot)
    }
}

impl Entity for WorkflowRule {
    type Id = WorkflowRuleId;

    fn id(&self) -> WorkflowRuleId {
        self.rule_id
    }
}

/// The rule that should run for `snapshot` in `status`.
///
/// Among matching active rules the earliest created wins (ties by id). An
/// out-of-stock item with no emergency rule falls back to a stock-alert rule.
pub fn select_rule<'a>(
    rules: &'a [WorkflowRule],
    snapshot: &StockSnapshot,
    status: StockStatus,
) -> Option<&'a WorkflowRule> {
    let wanted = WorkflowType::for_status(status)?;

    let pick = |workflow_type: WorkflowType| {
        rules
            .iter()
            .filter(|r| r.handles(workflow_type, snapshot))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.rule_id.cmp(&b.rule_id)))
    };

    match wanted {
        WorkflowType::EmergencyRestock => {
            pick(WorkflowType::EmergencyRestock).or_else(|| pick(WorkflowType::StockAlert))
        }
        WorkflowType::StockAlert => pick(WorkflowType::StockAlert),
    }
}

#[cfg(test)]
pub(crate) fn snapshot(quantity_on_hand: i64, low_stock_threshold: i64) -> StockSnapshot {
    StockSnapshot {
        tenant_id: TenantId::new(),
        item_id: InventoryItemId::new(AggregateId::new()),
        store_id: StoreId::new(),
        name: "Hydrating toner".to_string(),
        quantity_on_hand,
        low_stock_threshold,
    }
}
