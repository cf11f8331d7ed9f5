//! Low-stock trigger.
//!
//! Every inventory read-model update is fed through the item's episode. When
//! the episode says a workflow should fire, the first matching active rule
//! runs and its execution is recorded.

use std::io;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use glowdesk_core::TenantId;
use glowdesk_events::{ChangeKind, RowChange};
use glowdesk_workflows::{
    ActionRegistry, EpisodePhase, StockSnapshot, WorkflowError, WorkflowExecution, select_rule,
};

use crate::projections::inventory_stock::{self, InventoryReadModel};
use crate::realtime::ChangeFeed;
use crate::workers::{ProjectionWorker, WorkerHandle};
use crate::workflows::store::{WorkflowStore, WorkflowStoreError};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Store(#[from] WorkflowStoreError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("undecodable inventory row: {0}")]
    Decode(String),
}

#[derive(Debug)]
pub struct LowStockMonitor {
    workflows: Arc<WorkflowStore>,
    registry: ActionRegistry,
}

impl LowStockMonitor {
    pub fn new(workflows: Arc<WorkflowStore>, registry: ActionRegistry) -> Self {
        Self { workflows, registry }
    }

    pub fn workflows(&self) -> &Arc<WorkflowStore> {
        &self.workflows
    }

    /// Feed one stock reading. Returns the execution when a workflow ran.
    ///
    /// If no active rule matches, the episode is left unstarted so a rule
    /// added later still fires on the next reading.
    pub fn evaluate(
        &self,
        snapshot: &StockSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkflowExecution>, MonitorError> {
        let tenant_id = snapshot.tenant_id;
        let status = snapshot.status();

        self.workflows.with_episode(tenant_id, snapshot.item_id, |current| {
            let transition = EpisodePhase::advance(current, status);
            let Some(wanted) = transition.fire else {
                return (transition.next, Ok(None));
            };

            let rules = match self.workflows.rules(tenant_id) {
                Ok(rules) => rules,
                Err(e) => return (current, Err(e.into())),
            };
            let Some(rule) = select_rule(&rules, snapshot, status) else {
                debug!(%tenant_id, item_id = %snapshot.item_id, workflow = wanted.as_str(), "no active rule matches");
                return (current, Ok(None));
            };

            let execution = match self.registry.run(rule, wanted, snapshot, now) {
                Ok(execution) => execution,
                Err(e) => return (current, Err(e.into())),
            };
            if let Err(e) = self.workflows.record_execution(tenant_id, execution.clone()) {
                return (current, Err(e.into()));
            }

            for failed in execution.failed_actions() {
                warn!(%tenant_id, rule = %rule.name, action = failed.action.as_str(), detail = %failed.detail, "workflow action failed");
            }
            info!(
                %tenant_id,
                item_id = %snapshot.item_id,
                rule = %rule.name,
                workflow = wanted.as_str(),
                status = execution.status.as_str(),
                "low-stock workflow executed"
            );
            (transition.next, Ok(Some(execution)))
        })?
    }

    /// Evaluate every stock row of one business, e.g. after a restart or
    /// after new rules were added.
    pub fn scan_tenant(
        &self,
        tenant_id: TenantId,
        rows: impl IntoIterator<Item = InventoryReadModel>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkflowExecution>, MonitorError> {
        let mut fired = Vec::new();
        for row in rows {
            if let Some(execution) = self.evaluate(&row.snapshot(tenant_id), now)? {
                fired.push(execution);
            }
        }
        info!(%tenant_id, executed = fired.len(), "low-stock scan finished");
        Ok(fired)
    }

    /// Handle one realtime change; anything but an inventory row is ignored.
    pub fn handle_change(&self, change: &RowChange) -> Result<Option<WorkflowExecution>, MonitorError> {
        if change.table != inventory_stock::TABLE || change.kind == ChangeKind::Delete {
            return Ok(None);
        }
        let row: InventoryReadModel =
            serde_json::from_value(change.record.clone()).map_err(|e| MonitorError::Decode(e.to_string()))?;
        self.evaluate(&row.snapshot(change.tenant_id), Utc::now())
    }

    /// Run the monitor on the realtime feed in a background worker.
    pub fn spawn(self: Arc<Self>, feed: &ChangeFeed) -> io::Result<WorkerHandle> {
        ProjectionWorker::spawn("low-stock-monitor", feed.bus(), None, move |change: RowChange| {
            self.handle_change(&change).map(|_| ())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glowdesk_core::{AggregateId, StoreId};
    use glowdesk_inventory::{InventoryItemId, StockStatus};
    use glowdesk_workflows::{TriggerConditions, WorkflowAction, WorkflowRule, WorkflowType};

    use crate::workflows::actions::builtin_registry;
    use crate::workflows::outbox::Outboxes;

    struct Fixture {
        monitor: LowStockMonitor,
        outboxes: Arc<Outboxes>,
        tenant: TenantId,
        item: InventoryItemId,
        store: StoreId,
    }

    fn fixture() -> Fixture {
        let outboxes = Arc::new(Outboxes::default());
        let monitor = LowStockMonitor::new(Arc::new(WorkflowStore::new()), builtin_registry(outboxes.clone()));
        Fixture {
            monitor,
            outboxes,
            tenant: TenantId::new(),
            item: InventoryItemId::new(AggregateId::new()),
            store: StoreId::new(),
        }
    }

    impl Fixture {
        fn add_rule(&self, workflow_type: WorkflowType, actions: Vec<WorkflowAction>) -> WorkflowRule {
            let rule = WorkflowRule::new("Reorder", workflow_type, TriggerConditions::default(), actions, Utc::now()).unwrap();
            self.monitor.workflows().add_rule(self.tenant, rule).unwrap()
        }

        fn reading(&self, qty: i64) -> StockSnapshot {
            StockSnapshot {
                tenant_id: self.tenant,
                item_id: self.item,
                store_id: self.store,
                name: "Vitamin C serum".to_string(),
                quantity_on_hand: qty,
                low_stock_threshold: 5,
            }
        }

        fn row(&self, qty: i64) -> InventoryReadModel {
            InventoryReadModel {
                item_id: self.item,
                store_id: self.store,
                name: "Vitamin C serum".to_string(),
                quantity_on_hand: qty,
                low_stock_threshold: 5,
                status: StockStatus::classify(qty, 5),
                updated_at: Utc::now(),
            }
        }
    }

    #[test]
    fn fires_once_per_episode() {
        let f = fixture();
        f.add_rule(WorkflowType::StockAlert, vec![WorkflowAction::CreatePurchaseOrder]);

        assert!(f.monitor.evaluate(&f.reading(4), Utc::now()).unwrap().is_some());
        assert!(f.monitor.evaluate(&f.reading(3), Utc::now()).unwrap().is_none());
        assert!(f.monitor.evaluate(&f.reading(9), Utc::now()).unwrap().is_none());
        assert!(f.monitor.evaluate(&f.reading(2), Utc::now()).unwrap().is_some());

        let requests = f.outboxes.purchase_requests.list(f.tenant);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].quantity, 8);
        assert_eq!(f.monitor.workflows().rules(f.tenant).unwrap()[0].execution_count, 2);
    }

    #[test]
    fn escalates_once_when_the_shelf_empties() {
        let f = fixture();
        f.add_rule(WorkflowType::StockAlert, vec![WorkflowAction::SendNotification]);
        f.add_rule(WorkflowType::EmergencyRestock, vec![WorkflowAction::NotifyManager]);

        let first = f.monitor.evaluate(&f.reading(3), Utc::now()).unwrap().unwrap();
        let second = f.monitor.evaluate(&f.reading(0), Utc::now()).unwrap().unwrap();
        assert!(f.monitor.evaluate(&f.reading(0), Utc::now()).unwrap().is_none());

        assert_eq!(first.workflow_type, WorkflowType::StockAlert);
        assert_eq!(second.workflow_type, WorkflowType::EmergencyRestock);
        assert_eq!(f.outboxes.notifications.list(f.tenant).len(), 2);
    }

    #[test]
    fn rule_added_mid_episode_still_fires() {
        let f = fixture();
        assert!(f.monitor.evaluate(&f.reading(2), Utc::now()).unwrap().is_none());

        f.add_rule(WorkflowType::StockAlert, vec![WorkflowAction::SendNotification]);
        assert!(f.monitor.evaluate(&f.reading(2), Utc::now()).unwrap().is_some());
    }

    #[test]
    fn inactive_rules_never_fire() {
        let f = fixture();
        let rule = f.add_rule(WorkflowType::StockAlert, vec![WorkflowAction::SendNotification]);
        f.monitor.workflows().set_active(f.tenant, rule.rule_id, false).unwrap();

        assert!(f.monitor.evaluate(&f.reading(1), Utc::now()).unwrap().is_none());
        assert!(f.outboxes.notifications.list(f.tenant).is_empty());
    }

    #[test]
    fn scan_is_idempotent() {
        let f = fixture();
        f.add_rule(WorkflowType::StockAlert, vec![WorkflowAction::SendNotification]);

        let fired = f.monitor.scan_tenant(f.tenant, vec![f.row(1)], Utc::now()).unwrap();
        assert_eq!(fired.len(), 1);
        let again = f.monitor.scan_tenant(f.tenant, vec![f.row(1)], Utc::now()).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn ignores_changes_of_other_tables() {
        let f = fixture();
        f.add_rule(WorkflowType::StockAlert, vec![WorkflowAction::SendNotification]);

        let sale = RowChange::new(f.tenant, "sales", ChangeKind::Insert, serde_json::json!({}));
        assert!(f.monitor.handle_change(&sale).unwrap().is_none());

        let stock = RowChange::new(
            f.tenant,
            inventory_stock::TABLE,
            ChangeKind::Update,
            serde_json::to_value(f.row(0)).unwrap(),
        );
        let execution = f.monitor.handle_change(&stock).unwrap().unwrap();
        assert_eq!(execution.workflow_type, WorkflowType::EmergencyRestock);
    }
}
