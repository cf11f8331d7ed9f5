use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use glowdesk_core::{AggregateId, TenantId};
use glowdesk_events::EventEnvelope;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("failed to deserialize event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("projection state lock poisoned")]
    Poisoned,

    #[error("event store error: {0}")]
    Store(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// Last applied sequence number per `(business, aggregate)` stream.
///
/// Makes projections safe under at-least-once delivery: replays at or below
/// the cursor are skipped, gaps are rejected.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<CursorKey, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `apply` for `envelope` if it is the next event of its stream.
    ///
    /// Returns `Ok(None)` for duplicates. The cursor only advances when
    /// `apply` succeeds. The lock is held across `apply` so two deliveries
    /// of one stream never interleave.
    pub fn advance<T>(
        &self,
        envelope: &EventEnvelope<JsonValue>,
        apply: impl FnOnce() -> Result<T, ProjectionError>,
    ) -> Result<Option<T>, ProjectionError> {
        let key = CursorKey {
            tenant_id: envelope.tenant_id(),
            aggregate_id: envelope.aggregate_id(),
        };
        let seq = envelope.sequence_number();

        let mut cursors = self.inner.write().map_err(|_| ProjectionError::Poisoned)?;
        let last = cursors.get(&key).copied().unwrap_or(0);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(None);
        }
        // The first event seen may be mid-stream (worker started late);
        // after that, no gaps.
        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let out = apply()?;
        cursors.insert(key, seq);
        Ok(Some(out))
    }

    pub fn clear_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.retain(|k, _| k.tenant_id != tenant_id);
        }
    }
}

/// Decode the typed domain event carried by an envelope.
pub fn decode<E: DeserializeOwned>(envelope: &EventEnvelope<JsonValue>) -> Result<E, ProjectionError> {
    serde_json::from_value(envelope.payload().clone()).map_err(|e| ProjectionError::Deserialize(e.to_string()))
}

/// Reject events whose own `tenant_id` / id disagree with the envelope.
pub fn check_scope(
    envelope: &EventEnvelope<JsonValue>,
    event_tenant: TenantId,
    event_aggregate: AggregateId,
) -> Result<(), ProjectionError> {
    if event_tenant != envelope.tenant_id() {
        return Err(ProjectionError::TenantIsolation(
            "event tenant_id does not match envelope tenant_id".to_string(),
        ));
    }
    if event_aggregate != envelope.aggregate_id() {
        return Err(ProjectionError::TenantIsolation(
            "event aggregate id does not match envelope aggregate_id".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn envelope(tenant: TenantId, aggregate: AggregateId, seq: u64) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), tenant, aggregate, "inventory.item", seq, json!({}))
    }

    #[test]
    fn duplicates_are_skipped() {
        let cursors = StreamCursors::new();
        let (t, a) = (TenantId::new(), AggregateId::new());

        assert_eq!(cursors.advance(&envelope(t, a, 1), || Ok(1)).unwrap(), Some(1));
        assert_eq!(cursors.advance(&envelope(t, a, 1), || Ok(2)).unwrap(), None);
    }

    #[test]
    fn gaps_are_rejected() {
        let cursors = StreamCursors::new();
        let (t, a) = (TenantId::new(), AggregateId::new());

        cursors.advance(&envelope(t, a, 1), || Ok(())).unwrap();
        let err = cursors.advance(&envelope(t, a, 3), || Ok(())).unwrap_err();
        assert_eq!(err, ProjectionError::NonMonotonicSequence { last: 1, found: 3 });
    }

    #[test]
    fn failed_apply_does_not_advance() {
        let cursors = StreamCursors::new();
        let (t, a) = (TenantId::new(), AggregateId::new());

        let failed: Result<Option<()>, _> =
            cursors.advance(&envelope(t, a, 1), || Err(ProjectionError::Deserialize("bad".into())));
        assert!(failed.is_err());
        assert_eq!(cursors.advance(&envelope(t, a, 1), || Ok(7)).unwrap(), Some(7));
    }

    #[test]
    fn check_scope_catches_cross_tenant_payloads() {
        let (t, a) = (TenantId::new(), AggregateId::new());
        let env = envelope(t, a, 1);

        assert!(check_scope(&env, t, a).is_ok());
        assert!(matches!(
            check_scope(&env, TenantId::new(), a),
            Err(ProjectionError::TenantIsolation(_))
        ));
    }
}
