use serde_json::Value as JsonValue;
use tracing::warn;

use glowdesk_core::TenantId;
use glowdesk_events::EventEnvelope;
use glowdesk_sales::{SaleRecord, SalesOrderEvent, SalesOrderId};

use crate::event_store::aggregate_types::SALES_ORDER;
use crate::projections::Projection;
use crate::projections::cursor::{ProjectionError, StreamCursors, check_scope, decode};
use crate::read_model::TenantStore;
use crate::realtime::ChangeFeed;

pub const TABLE: &str = "sales";

/// Flat sales ledger (`sales` table): one `SaleRecord` per order.
///
/// Voided sales stay in the ledger flagged `voided`; aggregation skips them.
#[derive(Debug)]
pub struct SalesLedgerProjection<S>
where
    S: TenantStore<SalesOrderId, SaleRecord>,
{
    store: S,
    cursors: StreamCursors,
    feed: Option<ChangeFeed>,
}

impl<S> SalesLedgerProjection<S>
where
    S: TenantStore<SalesOrderId, SaleRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
            feed: None,
        }
    }

    pub fn with_change_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn get(&self, tenant_id: TenantId, order_id: &SalesOrderId) -> Option<SaleRecord> {
        self.store.get(tenant_id, order_id)
    }

    /// All sales of a business, oldest first.
    pub fn records(&self, tenant_id: TenantId) -> Vec<SaleRecord> {
        let mut rows = self.store.list(tenant_id);
        rows.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.order_id.cmp(&b.order_id)));
        rows
    }

    fn write(&self, tenant_id: TenantId, record: SaleRecord) {
        let existed = self.store.upsert(tenant_id, record.order_id, record.clone()).is_some();
        if let Some(feed) = &self.feed {
            feed.emit_row(tenant_id, TABLE, existed, &record);
        }
    }
}

impl<S> Projection for SalesLedgerProjection<S>
where
    S: TenantStore<SalesOrderId, SaleRecord>,
{
    fn name(&self) -> &'static str {
        TABLE
    }

    fn aggregate_type(&self) -> &'static str {
        SALES_ORDER
    }

    fn project(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();

        self.cursors.advance(envelope, || {
            match decode::<SalesOrderEvent>(envelope)? {
                SalesOrderEvent::SaleRecorded(e) => {
                    check_scope(envelope, e.tenant_id, e.order_id.0)?;
                    self.write(
                        tenant_id,
                        SaleRecord {
                            order_id: e.order_id,
                            store_id: e.store_id,
                            user_id: e.user_id,
                            sale_type: e.sale_type,
                            total: e.total,
                            occurred_at: e.occurred_at,
                            voided: false,
                        },
                    );
                }
                SalesOrderEvent::SaleVoided(e) => {
                    check_scope(envelope, e.tenant_id, e.order_id.0)?;
                    match self.store.get(tenant_id, &e.order_id) {
                        Some(mut record) => {
                            record.voided = true;
                            self.write(tenant_id, record);
                        }
                        None => warn!(%tenant_id, order_id = %e.order_id, "void for a sale the ledger has not seen"),
                    }
                }
            }
            Ok(())
        })?;

        Ok(())
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.cursors.clear_tenant(tenant_id);
        self.store.clear_tenant(tenant_id);
    }
}
