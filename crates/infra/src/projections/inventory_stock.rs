use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use glowdesk_core::{StoreId, TenantId};
use glowdesk_events::EventEnvelope;
use glowdesk_inventory::{InventoryEvent, InventoryItemId, StockStatus};
use glowdesk_workflows::StockSnapshot;

use crate::event_store::aggregate_types::INVENTORY_ITEM;
use crate::projections::Projection;
use crate::projections::cursor::{ProjectionError, StreamCursors, check_scope, decode};
use crate::read_model::TenantStore;
use crate::realtime::ChangeFeed;

pub const TABLE: &str = "inventory_stock";

/// Current stock of one item, with its derived low-stock status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryReadModel {
    pub item_id: InventoryItemId,
    pub store_id: StoreId,
    pub name: String,
    pub quantity_on_hand: i64,
    pub low_stock_threshold: i64,
    pub status: StockStatus,
    pub updated_at: DateTime<Utc>,
}

impl InventoryReadModel {
    fn reclassify(&mut self) {
        self.status = StockStatus::classify(self.quantity_on_hand, self.low_stock_threshold);
    }

    pub fn snapshot(&self, tenant_id: TenantId) -> StockSnapshot {
        StockSnapshot {
            tenant_id,
            item_id: self.item_id,
            store_id: self.store_id,
            name: self.name.clone(),
            quantity_on_hand: self.quantity_on_hand,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

/// Inventory stock projection (`inventory_stock` table).
#[derive(Debug)]
pub struct InventoryStockProjection<S>
where
    S: TenantStore<InventoryItemId, InventoryReadModel>,
{
    store: S,
    cursors: StreamCursors,
    feed: Option<ChangeFeed>,
}

impl<S> InventoryStockProjection<S>
where
    S: TenantStore<InventoryItemId, InventoryReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
            feed: None,
        }
    }

    /// Announce every row write on `feed`.
    pub fn with_change_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn get(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> Option<InventoryReadModel> {
        self.store.get(tenant_id, item_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<InventoryReadModel> {
        let mut rows = self.store.list(tenant_id);
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.item_id.cmp(&b.item_id)));
        rows
    }

    /// Items at or below their threshold, empty shelves first.
    pub fn low_stock(&self, tenant_id: TenantId, store_id: Option<StoreId>) -> Vec<InventoryReadModel> {
        let mut rows: Vec<_> = self
            .list(tenant_id)
            .into_iter()
            .filter(|r| r.status.is_low())
            .filter(|r| store_id.is_none_or(|s| s == r.store_id))
            .collect();
        rows.sort_by_key(|r| !r.status.is_out());
        rows
    }

    /// Apply one envelope and return the row it wrote, if any.
    pub fn apply_inventory_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<Option<InventoryReadModel>, ProjectionError> {
        let tenant_id = envelope.tenant_id();

        let applied = self.cursors.advance(envelope, || {
            let event: InventoryEvent = decode(envelope)?;
            let item_id = match &event {
                InventoryEvent::ItemCreated(e) => e.item_id,
                InventoryEvent::StockAdjusted(e) => e.item_id,
                InventoryEvent::ThresholdChanged(e) => e.item_id,
            };
            let event_tenant = match &event {
                InventoryEvent::ItemCreated(e) => e.tenant_id,
                InventoryEvent::StockAdjusted(e) => e.tenant_id,
                InventoryEvent::ThresholdChanged(e) => e.tenant_id,
            };
            check_scope(envelope, event_tenant, item_id.0)?;

            let row = match event {
                InventoryEvent::ItemCreated(e) => Some(InventoryReadModel {
                    item_id: e.item_id,
                    store_id: e.store_id,
                    name: e.name,
                    quantity_on_hand: 0,
                    low_stock_threshold: e.low_stock_threshold,
                    status: StockStatus::classify(0, e.low_stock_threshold),
                    updated_at: e.occurred_at,
                }),
                InventoryEvent::StockAdjusted(e) => self.store.get(tenant_id, &e.item_id).map(|mut rm| {
                    rm.quantity_on_hand += e.delta;
                    rm.updated_at = e.occurred_at;
                    rm.reclassify();
                    rm
                }),
                InventoryEvent::ThresholdChanged(e) => self.store.get(tenant_id, &e.item_id).map(|mut rm| {
                    rm.low_stock_threshold = e.low_stock_threshold;
                    rm.updated_at = e.occurred_at;
                    rm.reclassify();
                    rm
                }),
            };

            let Some(row) = row else {
                warn!(%tenant_id, %item_id, "inventory event for an item the projection has not seen; rebuild needed");
                return Ok(None);
            };

            let existed = self.store.upsert(tenant_id, row.item_id, row.clone()).is_some();
            if let Some(feed) = &self.feed {
                feed.emit_row(tenant_id, TABLE, existed, &row);
            }
            Ok(Some(row))
        })?;

        Ok(applied.flatten())
    }
}

impl<S> Projection for InventoryStockProjection<S>
where
    S: TenantStore<InventoryItemId, InventoryReadModel>,
{
    fn name(&self) -> &'static str {
        TABLE
    }

    fn aggregate_type(&self) -> &'static str {
        INVENTORY_ITEM
    }

    fn project(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        self.apply_inventory_envelope(envelope).map(|_| ())
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.cursors.clear_tenant(tenant_id);
        self.store.clear_tenant(tenant_id);
    }
}
