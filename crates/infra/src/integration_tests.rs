//! End-to-end tests of the event-sourced pipeline.
//!
//! Command → EventStore → EventBus → Projection → ChangeFeed → LowStockMonitor
//!
//! Verifies:
//! - Stock changes reach the read model and trigger reorder workflows once per episode
//! - Business isolation holds across projections and workflows
//! - Stale writers are rejected
//! - Projections rebuild from the store

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use glowdesk_commissions::{CommissionSummary, CommissionTier};
use glowdesk_core::{AggregateId, ExpectedVersion, StoreId, TenantId, UserId};
use glowdesk_events::{EventEnvelope, InMemoryEventBus};
use glowdesk_inventory::{
    AdjustStock, CreateItem, InventoryCommand, InventoryEvent, InventoryItem, InventoryItemId, ItemCreated,
};
use glowdesk_sales::{
    Period, RecordSale, SaleRecord, SaleType, SalesOrder, SalesOrderCommand, SalesOrderId, VoidSale,
};
use glowdesk_workflows::{TriggerConditions, WorkflowAction, WorkflowRule, WorkflowType};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::aggregate_types::{INVENTORY_ITEM, SALES_ORDER};
use crate::event_store::{EventStore, EventStoreError, InMemoryEventStore, UncommittedEvent};
use crate::projections::{InventoryReadModel, InventoryStockProjection, Projection, SalesLedgerProjection};
use crate::read_model::InMemoryTenantStore;
use crate::realtime::ChangeFeed;
use crate::workers::{ProjectionWorker, WorkerHandle};
use crate::workflows::{LowStockMonitor, Outboxes, WorkflowStore, builtin_registry};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Inventory = InventoryStockProjection<Arc<InMemoryTenantStore<InventoryItemId, InventoryReadModel>>>;
type Ledger = SalesLedgerProjection<Arc<InMemoryTenantStore<SalesOrderId, SaleRecord>>>;

struct Pipeline {
    store: Arc<InMemoryEventStore>,
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    inventory: Arc<Inventory>,
    ledger: Arc<Ledger>,
    workflows: Arc<WorkflowStore>,
    outboxes: Arc<Outboxes>,
    workers: Vec<WorkerHandle>,
}

impl Pipeline {
    fn start() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let feed = ChangeFeed::new();

        let inventory = Arc::new(InventoryStockProjection::new(Arc::new(InMemoryTenantStore::new())).with_change_feed(feed.clone()));
        let ledger = Arc::new(SalesLedgerProjection::new(Arc::new(InMemoryTenantStore::new())).with_change_feed(feed.clone()));
        let workflows = Arc::new(WorkflowStore::new());
        let outboxes = Arc::new(Outboxes::default());
        let monitor = Arc::new(LowStockMonitor::new(workflows.clone(), builtin_registry(outboxes.clone())));

        let mut workers = Vec::new();
        let p = inventory.clone();
        workers.push(
            ProjectionWorker::spawn("inventory_stock", bus.clone(), None, move |env: EventEnvelope<JsonValue>| {
                p.apply_envelope(&env)
            })
            .unwrap(),
        );
        let p = ledger.clone();
        workers.push(
            ProjectionWorker::spawn("sales", bus.clone(), None, move |env: EventEnvelope<JsonValue>| p.apply_envelope(&env))
                .unwrap(),
        );
        workers.push(monitor.spawn(&feed).unwrap());

        Self {
            dispatcher: CommandDispatcher::new(store.clone(), bus),
            store,
            inventory,
            ledger,
            workflows,
            outboxes,
            workers,
        }
    }

    fn create_item(&self, tenant: TenantId, threshold: i64) -> InventoryItemId {
        let item_id = InventoryItemId::new(AggregateId::new());
        let cmd = InventoryCommand::CreateItem(CreateItem {
            tenant_id: tenant,
            item_id,
            store_id: StoreId::new(),
            name: "Hyaluronic serum".to_string(),
            low_stock_threshold: threshold,
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(tenant, item_id.0, INVENTORY_ITEM, cmd, |_, id| InventoryItem::empty(InventoryItemId::new(id)))
            .unwrap();
        item_id
    }

    fn adjust(&self, tenant: TenantId, item_id: InventoryItemId, delta: i64) -> Result<(), DispatchError> {
        let cmd = InventoryCommand::AdjustStock(AdjustStock {
            tenant_id: tenant,
            item_id,
            delta,
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(tenant, item_id.0, INVENTORY_ITEM, cmd, |_, id| InventoryItem::empty(InventoryItemId::new(id)))
            .map(|_| ())
    }

    fn sell(&self, tenant: TenantId, user: UserId, cents: i64) -> SalesOrderId {
        let order_id = SalesOrderId::new(AggregateId::new());
        let cmd = SalesOrderCommand::RecordSale(RecordSale {
            tenant_id: tenant,
            order_id,
            store_id: StoreId::new(),
            user_id: user,
            sale_type: SaleType::Open,
            total: Decimal::new(cents, 2),
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(tenant, order_id.0, SALES_ORDER, cmd, |_, id| SalesOrder::empty(SalesOrderId::new(id)))
            .unwrap();
        order_id
    }

    fn add_reorder_rule(&self, tenant: TenantId) {
        let rule = WorkflowRule::new(
            "Reorder when low",
            WorkflowType::StockAlert,
            TriggerConditions::default(),
            vec![WorkflowAction::CreatePurchaseOrder],
            Utc::now(),
        )
        .unwrap();
        self.workflows.add_rule(tenant, rule).unwrap();
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for worker in self.workers.drain(..) {
            worker.shutdown();
        }
    }
}

fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if check() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached in time");
}

#[test]
fn stock_drop_reaches_read_model_and_triggers_reorder() {
    let pipeline = Pipeline::start();
    let tenant = TenantId::new();
    pipeline.add_reorder_rule(tenant);

    // A new item starts empty, which already counts as out of stock.
    let item = pipeline.create_item(tenant, 5);
    pipeline.adjust(tenant, item, 10).unwrap();
    pipeline.adjust(tenant, item, -7).unwrap();

    eventually(|| pipeline.outboxes.purchase_requests.list(tenant).len() == 2);
    let row = pipeline.inventory.get(tenant, &item).unwrap();
    assert_eq!(row.quantity_on_hand, 3);
    assert!(row.status.is_low());

    let quantities: Vec<_> = pipeline.outboxes.purchase_requests.list(tenant).into_iter().map(|r| r.quantity).collect();
    assert_eq!(quantities, vec![7, 10]);
}

#[test]
fn one_alert_per_episode_plus_one_escalation() {
    let pipeline = Pipeline::start();
    let tenant = TenantId::new();
    pipeline.add_reorder_rule(tenant);

    let item = pipeline.create_item(tenant, 5);
    pipeline.adjust(tenant, item, 10).unwrap();
    pipeline.adjust(tenant, item, -7).unwrap();
    pipeline.adjust(tenant, item, -1).unwrap();
    pipeline.adjust(tenant, item, -2).unwrap();

    // The feed is ordered, so the -1 reading was handled before the zero reading fired.
    eventually(|| pipeline.workflows.executions(tenant, None).unwrap().len() == 3);
    let fired: Vec<_> = pipeline
        .workflows
        .executions(tenant, None)
        .unwrap()
        .into_iter()
        .map(|e| e.workflow_type)
        .collect();
    assert_eq!(
        fired,
        vec![WorkflowType::EmergencyRestock, WorkflowType::StockAlert, WorkflowType::EmergencyRestock]
    );
    assert_eq!(pipeline.outboxes.purchase_requests.list(tenant).len(), 3);
    assert_eq!(pipeline.workflows.rules(tenant).unwrap()[0].execution_count, 3);
}

#[test]
fn businesses_do_not_see_each_others_stock_or_workflows() {
    let pipeline = Pipeline::start();
    let with_rule = TenantId::new();
    let without_rule = TenantId::new();
    pipeline.add_reorder_rule(with_rule);

    let quiet_item = pipeline.create_item(without_rule, 5);
    pipeline.adjust(without_rule, quiet_item, 1).unwrap();
    let item = pipeline.create_item(with_rule, 5);
    pipeline.adjust(with_rule, item, 1).unwrap();

    eventually(|| pipeline.outboxes.purchase_requests.list(with_rule).len() == 1);
    assert!(pipeline.outboxes.purchase_requests.list(without_rule).is_empty());
    assert!(pipeline.workflows.executions(without_rule, None).unwrap().is_empty());

    assert!(pipeline.inventory.get(with_rule, &quiet_item).is_none());
    assert!(pipeline.inventory.get(without_rule, &item).is_none());
    assert_eq!(pipeline.inventory.list(without_rule).len(), 1);
}

#[test]
fn rejected_adjustment_leaves_stock_untouched() {
    let pipeline = Pipeline::start();
    let tenant = TenantId::new();
    let item = pipeline.create_item(tenant, 2);
    pipeline.adjust(tenant, item, 4).unwrap();

    let err = pipeline.adjust(tenant, item, -5).unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));

    eventually(|| pipeline.inventory.get(tenant, &item).is_some_and(|r| r.quantity_on_hand == 4));
    assert_eq!(pipeline.store.load_stream(tenant, item.0).unwrap().len(), 2);
}

#[test]
fn stale_writer_is_rejected() {
    let pipeline = Pipeline::start();
    let tenant = TenantId::new();
    let item = pipeline.create_item(tenant, 2);

    let event = InventoryEvent::ItemCreated(ItemCreated {
        tenant_id: tenant,
        item_id: item,
        store_id: StoreId::new(),
        name: "Duplicate".to_string(),
        low_stock_threshold: 2,
        occurred_at: Utc::now(),
    });
    let stale = UncommittedEvent::from_typed(tenant, item.0, INVENTORY_ITEM, Uuid::now_v7(), &event).unwrap();

    let err = pipeline.store.append(vec![stale], ExpectedVersion::Exact(0)).unwrap_err();
    assert!(matches!(err, EventStoreError::Concurrency(_)));
}

#[test]
fn ledger_feeds_commission_summary_without_voided_sales() {
    let pipeline = Pipeline::start();
    let tenant = TenantId::new();
    let user = UserId::new();

    pipeline.sell(tenant, user, 30_000);
    pipeline.sell(tenant, user, 25_000);
    let refunded = pipeline.sell(tenant, user, 10_000);
    let void = SalesOrderCommand::VoidSale(VoidSale {
        tenant_id: tenant,
        order_id: refunded,
        reason: Some("refund".to_string()),
        occurred_at: Utc::now(),
    });
    pipeline
        .dispatcher
        .dispatch(tenant, refunded.0, SALES_ORDER, void, |_, id| SalesOrder::empty(SalesOrderId::new(id)))
        .unwrap();

    eventually(|| pipeline.ledger.get(tenant, &refunded).is_some_and(|r| r.voided));

    let tiers = vec![
        CommissionTier {
            tier_number: 1,
            name: "Base".to_string(),
            target_amount: Decimal::ZERO,
            commission_rate: Decimal::new(5, 2),
            target_period: Period::Monthly,
        },
        CommissionTier {
            tier_number: 2,
            name: "Star".to_string(),
            target_amount: Decimal::new(500, 0),
            commission_rate: Decimal::new(8, 2),
            target_period: Period::Monthly,
        },
    ];
    let records = pipeline.ledger.records(tenant);
    let summary = CommissionSummary::compute(user, &tiers, &records, Utc::now());

    assert_eq!(summary.sales.total, Decimal::new(550, 0));
    assert_eq!(summary.applied_tier.map(|t| t.tier_number), Some(2));
    assert_eq!(summary.estimated_commission, Decimal::new(44, 0));
}

#[test]
fn projection_rebuild_matches_live_read_model() {
    let pipeline = Pipeline::start();
    let tenant = TenantId::new();
    let a = pipeline.create_item(tenant, 3);
    let b = pipeline.create_item(tenant, 3);
    pipeline.adjust(tenant, a, 8).unwrap();
    pipeline.adjust(tenant, b, 1).unwrap();

    eventually(|| {
        pipeline.inventory.get(tenant, &a).is_some_and(|r| r.quantity_on_hand == 8)
            && pipeline.inventory.get(tenant, &b).is_some_and(|r| r.quantity_on_hand == 1)
    });

    let fresh: Inventory = InventoryStockProjection::new(Arc::new(InMemoryTenantStore::new()));
    let replayed = fresh.rebuild_tenant(pipeline.store.as_ref(), tenant).unwrap();
    assert_eq!(replayed, 4);

    let quantities = |p: &Inventory| -> Vec<(InventoryItemId, i64)> {
        let mut rows: Vec<_> = p.list(tenant).into_iter().map(|r| (r.item_id, r.quantity_on_hand)).collect();
        rows.sort();
        rows
    };
    assert_eq!(quantities(&fresh), quantities(&pipeline.inventory));

    // Rebuilding twice gives the same rows.
    fresh.rebuild_tenant(pipeline.store.as_ref(), tenant).unwrap();
    assert_eq!(quantities(&fresh), quantities(&pipeline.inventory));
}
