//! Read model builders.
//!
//! Projections consume published envelopes and keep business-isolated read
//! models. They are idempotent under at-least-once delivery (per-stream
//! cursors) and can be rebuilt from the event store at any time.

pub mod commission_tiers;
pub mod cursor;
pub mod inventory_stock;
pub mod sales_goals;
pub mod sales_ledger;

use serde_json::Value as JsonValue;
use tracing::info;

use glowdesk_core::TenantId;
use glowdesk_events::EventEnvelope;

use crate::event_store::EventStore;

pub use commission_tiers::{CommissionTiersProjection, TierScheduleReadModel};
pub use cursor::{ProjectionError, StreamCursors};
pub use inventory_stock::{InventoryReadModel, InventoryStockProjection};
pub use sales_goals::{SalesGoalReadModel, SalesGoalsProjection};
pub use sales_ledger::SalesLedgerProjection;

/// Common surface of every projection.
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stream type this projection folds; other envelopes are ignored.
    fn aggregate_type(&self) -> &'static str;

    /// Apply one envelope of this projection's aggregate type.
    fn project(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Forget all rows and cursors of one business.
    fn reset_tenant(&self, tenant_id: TenantId);

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != self.aggregate_type() {
            return Ok(());
        }
        self.project(envelope)
    }

    /// Drop the business's rows and replay its streams from the store.
    /// Returns the number of events replayed.
    fn rebuild_tenant(&self, store: &dyn EventStore, tenant_id: TenantId) -> Result<usize, ProjectionError> {
        let events = store
            .load_by_type(tenant_id, self.aggregate_type())
            .map_err(|e| ProjectionError::Store(e.to_string()))?;

        self.reset_tenant(tenant_id);
        for stored in &events {
            self.project(&stored.to_envelope())?;
        }

        info!(projection = self.name(), %tenant_id, events = events.len(), "projection rebuilt");
        Ok(events.len())
    }
}
