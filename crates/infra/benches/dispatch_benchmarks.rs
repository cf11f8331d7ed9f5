use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use glowdesk_commissions::{CommissionSummary, CommissionTier};
use glowdesk_core::{AggregateId, StoreId, TenantId, UserId};
use glowdesk_events::{EventEnvelope, InMemoryEventBus};
use glowdesk_infra::command_dispatcher::CommandDispatcher;
use glowdesk_infra::event_store::InMemoryEventStore;
use glowdesk_infra::event_store::aggregate_types::{INVENTORY_ITEM, SALES_ORDER};
use glowdesk_infra::projections::{InventoryStockProjection, Projection};
use glowdesk_infra::read_model::InMemoryTenantStore;
use glowdesk_infra::workflows::{LowStockMonitor, Outboxes, WorkflowStore, builtin_registry};
use glowdesk_inventory::{AdjustStock, CreateItem, InventoryCommand, InventoryItem, InventoryItemId};
use glowdesk_sales::{Period, RecordSale, SaleRecord, SaleType, SalesOrder, SalesOrderCommand, SalesOrderId};
use glowdesk_workflows::{StockSnapshot, TriggerConditions, WorkflowAction, WorkflowRule, WorkflowType};

type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>>;

fn dispatcher() -> Dispatcher {
    CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryEventBus::new()))
}

fn create_item(d: &Dispatcher, tenant_id: TenantId) -> InventoryItemId {
    let item_id = InventoryItemId::new(AggregateId::new());
    let cmd = InventoryCommand::CreateItem(CreateItem {
        tenant_id,
        item_id,
        store_id: StoreId::new(),
        name: "Retinol night cream".to_string(),
        low_stock_threshold: 5,
        occurred_at: Utc::now(),
    });
    d.dispatch(tenant_id, item_id.0, INVENTORY_ITEM, cmd, |_, id| InventoryItem::empty(InventoryItemId::new(id)))
        .unwrap();
    item_id
}

fn adjust(d: &Dispatcher, tenant_id: TenantId, item_id: InventoryItemId, delta: i64) {
    let cmd = InventoryCommand::AdjustStock(AdjustStock {
        tenant_id,
        item_id,
        delta,
        occurred_at: Utc::now(),
    });
    d.dispatch(tenant_id, item_id.0, INVENTORY_ITEM, cmd, |_, id| InventoryItem::empty(InventoryItemId::new(id)))
        .unwrap();
}

fn bench_command_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_latency");

    group.bench_function("record_sale_fresh_stream", |b| {
        let d = dispatcher();
        let tenant_id = TenantId::new();
        b.iter(|| {
            let order_id = SalesOrderId::new(AggregateId::new());
            let cmd = SalesOrderCommand::RecordSale(RecordSale {
                tenant_id,
                order_id,
                store_id: StoreId::new(),
                user_id: UserId::new(),
                sale_type: SaleType::Upsell,
                total: Decimal::new(8_950, 2),
                occurred_at: Utc::now(),
            });
            black_box(
                d.dispatch(tenant_id, order_id.0, SALES_ORDER, cmd, |_, id| SalesOrder::empty(SalesOrderId::new(id)))
                    .unwrap(),
            );
        });
    });

    for history in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("adjust_stock_with_history", history), &history, |b, &history| {
            let d = dispatcher();
            let tenant_id = TenantId::new();
            let item_id = create_item(&d, tenant_id);
            for _ in 0..history {
                adjust(&d, tenant_id, item_id, 1);
            }
            b.iter(|| adjust(&d, tenant_id, item_id, 1));
        });
    }

    group.finish();
}

fn bench_projection_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_rebuild");

    for items in [10usize, 100, 1000] {
        let d = dispatcher();
        let tenant_id = TenantId::new();
        for _ in 0..items {
            let item_id = create_item(&d, tenant_id);
            adjust(&d, tenant_id, item_id, 12);
            adjust(&d, tenant_id, item_id, -9);
        }

        group.throughput(Throughput::Elements((items * 3) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            let projection = InventoryStockProjection::new(Arc::new(InMemoryTenantStore::new()));
            b.iter(|| black_box(projection.rebuild_tenant(d.store().as_ref(), tenant_id).unwrap()));
        });
    }

    group.finish();
}

fn bench_low_stock_evaluate(c: &mut Criterion) {
    let tenant_id = TenantId::new();
    let workflows = Arc::new(WorkflowStore::new());
    let rule = WorkflowRule::new(
        "Reorder",
        WorkflowType::StockAlert,
        TriggerConditions::default(),
        vec![WorkflowAction::SendNotification],
        Utc::now(),
    )
    .unwrap();
    workflows.add_rule(tenant_id, rule).unwrap();
    let monitor = LowStockMonitor::new(workflows, builtin_registry(Arc::new(Outboxes::default())));

    let snapshot = StockSnapshot {
        tenant_id,
        item_id: InventoryItemId::new(AggregateId::new()),
        store_id: StoreId::new(),
        name: "Clay mask".to_string(),
        quantity_on_hand: 3,
        low_stock_threshold: 5,
    };

    // After the first reading the episode is open, so this measures the steady state.
    c.bench_function("low_stock_evaluate_within_episode", |b| {
        b.iter(|| black_box(monitor.evaluate(&snapshot, Utc::now()).unwrap()));
    });
}

fn bench_commission_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("commission_summary");
    let user = UserId::new();
    let tiers: Vec<CommissionTier> = (1..=5)
        .map(|n| CommissionTier {
            tier_number: n,
            name: format!("Tier {n}"),
            target_amount: Decimal::from(1_000 * (n as i64 - 1)),
            commission_rate: Decimal::new(4 + n as i64, 2),
            target_period: Period::Monthly,
        })
        .collect();

    for sales in [100usize, 1000, 10_000] {
        let now = Utc::now();
        let records: Vec<SaleRecord> = (0..sales)
            .map(|i| SaleRecord {
                order_id: SalesOrderId::new(AggregateId::new()),
                store_id: StoreId::new(),
                user_id: if i % 3 == 0 { UserId::new() } else { user },
                sale_type: if i % 2 == 0 { SaleType::Open } else { SaleType::Upsell },
                total: Decimal::new(4_500, 2),
                occurred_at: now - Duration::minutes(i as i64),
                voided: i % 17 == 0,
            })
            .collect();

        group.throughput(Throughput::Elements(sales as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sales), &records, |b, records| {
            b.iter(|| black_box(CommissionSummary::compute(user, &tiers, records, now)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_command_latency,
    bench_projection_rebuild,
    bench_low_stock_evaluate,
    bench_commission_summary
);
criterion_main!(benches);
