use std::{
    collections::HashSet,
    convert::Infallible,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{info, warn};

use glowdesk_commissions::TierScope;
use glowdesk_core::{Aggregate, AggregateId, DomainError, TenantId};
use glowdesk_events::{EventEnvelope, InMemoryEventBus, RowChange};
use glowdesk_goals::SalesGoalId;
use glowdesk_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent},
    projections::{
        CommissionTiersProjection, InventoryReadModel, InventoryStockProjection, Projection,
        SalesGoalReadModel, SalesGoalsProjection, SalesLedgerProjection, TierScheduleReadModel,
    },
    read_model::InMemoryTenantStore,
    realtime::ChangeFeed,
    workers::{ProjectionWorker, WorkerHandle},
    workflows::{LowStockMonitor, Outboxes, WorkflowStore, builtin_registry},
};
use glowdesk_inventory::InventoryItemId;
use glowdesk_sales::{SaleRecord, SalesOrderId};

use crate::config::ApiConfig;

type EnvelopeBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Store<K, V> = Arc<InMemoryTenantStore<K, V>>;

pub type Dispatcher = CommandDispatcher<Arc<dyn EventStore>, EnvelopeBus>;
pub type InventoryView = InventoryStockProjection<Store<InventoryItemId, InventoryReadModel>>;
pub type SalesView = SalesLedgerProjection<Store<SalesOrderId, SaleRecord>>;
pub type TiersView = CommissionTiersProjection<Store<TierScope, TierScheduleReadModel>>;
pub type GoalsView = SalesGoalsProjection<Store<SalesGoalId, SalesGoalReadModel>>;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("failed to start background worker: {0}")]
    Worker(#[from] io::Error),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}

/// Everything the route handlers need: the write side, the read models,
/// the workflow runtime and the realtime broadcast.
pub struct AppServices {
    dispatcher: Dispatcher,
    pub inventory: Arc<InventoryView>,
    pub sales: Arc<SalesView>,
    pub tiers: Arc<TiersView>,
    pub goals: Arc<GoalsView>,
    pub workflows: Arc<WorkflowStore>,
    pub outboxes: Arc<Outboxes>,
    pub monitor: Arc<LowStockMonitor>,
    realtime_tx: broadcast::Sender<RowChange>,
    workers: Mutex<Vec<WorkerHandle>>,
    /// Businesses whose read models were rebuilt from a durable store.
    /// `None` when the store starts empty with the process.
    warmed: Option<Mutex<HashSet<TenantId>>>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}

async fn open_event_store(config: &ApiConfig) -> Result<(Arc<dyn EventStore>, bool), ServicesError> {
    match config.database_url.as_deref() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = glowdesk_infra::event_store::PostgresEventStore::connect(url).await?;
            store.migrate().await?;
            info!("using postgres event store");
            Ok((Arc::new(store), true))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            warn!("DATABASE_URL is set but the postgres feature is disabled; using the in-memory event store");
            Ok((Arc::new(InMemoryEventStore::new()), false))
        }
        None => Ok((Arc::new(InMemoryEventStore::new()), false)),
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    let (store, durable) = open_event_store(config).await?;
    let bus: EnvelopeBus = Arc::new(InMemoryEventBus::new());
    let feed = ChangeFeed::new();

    let inventory = Arc::new(InventoryStockProjection::new(Arc::new(InMemoryTenantStore::new())).with_change_feed(feed.clone()));
    let sales = Arc::new(SalesLedgerProjection::new(Arc::new(InMemoryTenantStore::new())).with_change_feed(feed.clone()));
    let tiers = Arc::new(CommissionTiersProjection::new(Arc::new(InMemoryTenantStore::new())).with_change_feed(feed.clone()));
    let goals = Arc::new(SalesGoalsProjection::new(Arc::new(InMemoryTenantStore::new())).with_change_feed(feed.clone()));

    let workflows = Arc::new(WorkflowStore::new().with_change_feed(feed.clone()));
    let outboxes = Arc::new(Outboxes::new(Some(feed.clone())));
    let monitor = Arc::new(LowStockMonitor::new(workflows.clone(), builtin_registry(outboxes.clone())));

    // SSE fan-out: lossy broadcast, filtered per business in the handler.
    let (realtime_tx, _) = broadcast::channel::<RowChange>(config.realtime_capacity);

    let mut workers = Vec::new();

    let projections: Vec<Arc<dyn Projection>> = vec![inventory.clone(), sales.clone(), tiers.clone(), goals.clone()];
    workers.push(ProjectionWorker::spawn(
        "projections",
        bus.clone(),
        None,
        move |env: EventEnvelope<JsonValue>| {
            projections
                .iter()
                .map(|p| p.apply_envelope(&env))
                .fold(Ok(()), |acc, r| acc.and(r))
        },
    )?);

    let tx = realtime_tx.clone();
    workers.push(ProjectionWorker::spawn("realtime-bridge", feed.bus(), None, move |change: RowChange| {
        // No receivers simply means no open streams.
        let _ = tx.send(change);
        Ok::<(), Infallible>(())
    })?);

    if config.low_stock_monitor {
        workers.push(monitor.clone().spawn(&feed)?);
    } else {
        info!("low-stock monitor disabled; use POST /workflows/scan");
    }

    Ok(AppServices {
        dispatcher: CommandDispatcher::new(store, bus),
        inventory,
        sales,
        tiers,
        goals,
        workflows,
        outboxes,
        monitor,
        realtime_tx,
        workers: Mutex::new(workers),
        warmed: durable.then(|| Mutex::new(HashSet::new())),
    })
}

impl AppServices {
    pub fn realtime_tx(&self) -> &broadcast::Sender<RowChange> {
        &self.realtime_tx
    }

    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: glowdesk_events::Event + Serialize + DeserializeOwned,
    {
        self.dispatcher
            .dispatch(tenant_id, aggregate_id, aggregate_type, command, make_aggregate)
    }

    /// Rebuild a business's read models from the durable store the first
    /// time it is seen after startup. No-op for the in-memory store.
    pub fn ensure_tenant_loaded(&self, tenant_id: TenantId) {
        let Some(warmed) = &self.warmed else {
            return;
        };
        let Ok(mut warmed) = warmed.lock() else {
            warn!(%tenant_id, "tenant warm-up lock poisoned");
            return;
        };
        if warmed.contains(&tenant_id) {
            return;
        }

        let store = self.dispatcher.store().as_ref();
        let projections: [&dyn Projection; 4] = [&*self.inventory, &*self.sales, &*self.tiers, &*self.goals];
        let mut ok = true;
        for p in projections {
            if let Err(e) = p.rebuild_tenant(store, tenant_id) {
                warn!(%tenant_id, projection = p.name(), error = %e, "read model rebuild failed");
                ok = false;
            }
        }
        if ok {
            warmed.insert(tenant_id);
        }
    }

    /// Stop all background workers.
    pub fn shutdown(&self) {
        let workers = match self.workers.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(_) => return,
        };
        for w in workers {
            let name = w.name();
            w.shutdown();
            info!(worker = name, "worker stopped");
        }
    }
}

/// SSE stream of one business's row changes (used by `/stream`).
///
/// Each event is named after its table and carries the `RowChange` as JSON.
/// Clients that fall behind the broadcast buffer silently miss messages.
pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(change) if change.tenant_id == tenant_id => {
            let data = serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(change.table.clone()).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
