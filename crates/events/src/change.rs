//! Realtime row-change feed.
//!
//! Read models announce every write as a `RowChange` (insert / update /
//! delete) on a channel keyed by business. Clients subscribe once per
//! business and fold the changes into their local state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use glowdesk_core::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change on a read model table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub tenant_id: TenantId,
    /// Read model name, e.g. "inventory_stock" or "workflow_executions".
    pub table: String,
    pub kind: ChangeKind,
    /// The row after the change (the removed row for deletes).
    pub record: JsonValue,
    pub committed_at: DateTime<Utc>,
}

impl RowChange {
    pub fn new(tenant_id: TenantId, table: impl Into<String>, kind: ChangeKind, record: JsonValue) -> Self {
        Self {
            tenant_id,
            table: table.into(),
            kind,
            record,
            committed_at: Utc::now(),
        }
    }

    /// Channel name clients subscribe to (one per business).
    pub fn channel(&self) -> String {
        format!("business:{}", self.tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_serializes_like_postgres_changefeeds() {
        let json = serde_json::to_string(&ChangeKind::Update).unwrap();
        assert_eq!(json, "\"UPDATE\"");
    }

    #[test]
    fn channel_is_keyed_by_business() {
        let tenant = TenantId::new();
        let change = RowChange::new(tenant, "inventory_stock", ChangeKind::Insert, serde_json::json!({}));
        assert_eq!(change.channel(), format!("business:{tenant}"));
    }
}
