//! Process-wide realtime change feed.
//!
//! Read models announce each row they write as a `RowChange`. Subscribers
//! (the SSE endpoint, the low-stock monitor) filter by business themselves.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use glowdesk_core::TenantId;
use glowdesk_events::{ChangeKind, EventBus, InMemoryEventBus, RowChange, Subscription};

#[derive(Debug, Clone, Default)]
pub struct ChangeFeed {
    bus: Arc<InMemoryEventBus<RowChange>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<RowChange> {
        self.bus.subscribe()
    }

    /// Underlying bus, for `ProjectionWorker`.
    pub fn bus(&self) -> Arc<InMemoryEventBus<RowChange>> {
        self.bus.clone()
    }

    /// Best effort: a feed failure never fails the write that caused it.
    pub fn emit(&self, change: RowChange) {
        if let Err(err) = self.bus.publish(change) {
            warn!(error = ?err, "realtime change feed publish failed");
        }
    }

    /// Emit `record` as an insert (no previous row) or update.
    pub fn emit_row<T: Serialize>(&self, tenant_id: TenantId, table: &str, existed: bool, record: &T) {
        let kind = if existed { ChangeKind::Update } else { ChangeKind::Insert };
        self.emit_kind(tenant_id, table, kind, record);
    }

    pub fn emit_kind<T: Serialize>(&self, tenant_id: TenantId, table: &str, kind: ChangeKind, record: &T) {
        match serde_json::to_value(record) {
            Ok(value) => self.emit(RowChange::new(tenant_id, table, kind, value)),
            Err(err) => warn!(table, error = %err, "failed to serialize realtime row"),
        }
    }
}
