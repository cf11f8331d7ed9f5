use std::collections::HashMap;
use std::sync::RwLock;

use glowdesk_core::{AggregateId, ExpectedVersion, TenantId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store for tests, dev and single-node runs.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

fn poisoned() -> EventStoreError {
    EventStoreError::Backend("event store lock poisoned".to_string())
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        let tenant_id = first.tenant_id;
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let mut streams = self.streams.write().map_err(|_| poisoned())?;
        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, sequence_number)| StoredEvent {
                event_id: e.event_id,
                tenant_id: e.tenant_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();

        stream.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.get(&key).cloned().unwrap_or_default())
    }

    fn load_by_type(
        &self,
        tenant_id: TenantId,
        aggregate_type: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;

        let mut keys: Vec<&StreamKey> = streams
            .iter()
            .filter(|(k, stream)| {
                k.tenant_id == tenant_id
                    && stream.first().is_some_and(|e| e.aggregate_type == aggregate_type)
            })
            .map(|(k, _)| k)
            .collect();
        keys.sort_by_key(|k| k.aggregate_id);

        Ok(keys
            .into_iter()
            .flat_map(|k| streams[k].iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn event(tenant_id: TenantId, aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "inventory.item.stock_adjusted".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "delta": 3 }),
        }
    }

    #[test]
    fn sequence_numbers_continue_across_appends() {
        let store = InMemoryEventStore::new();
        let tenant = TenantId::new();
        let item = AggregateId::new();

        let first = store
            .append(vec![event(tenant, item, "inventory.item"); 2], ExpectedVersion::Exact(0))
            .unwrap();
        let second = store
            .append(vec![event(tenant, item, "inventory.item")], ExpectedVersion::Exact(2))
            .unwrap();

        let seqs: Vec<u64> = first.iter().chain(&second).map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn stale_writer_is_rejected() {
        let store = InMemoryEventStore::new();
        let tenant = TenantId::new();
        let item = AggregateId::new();

        store
            .append(vec![event(tenant, item, "inventory.item")], ExpectedVersion::Exact(0))
            .unwrap();
        let err = store
            .append(vec![event(tenant, item, "inventory.item")], ExpectedVersion::Exact(0))
            .unwrap_err();

        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(tenant, item).unwrap().len(), 1);
    }

    #[test]
    fn mixed_tenant_batch_is_rejected() {
        let store = InMemoryEventStore::new();
        let item = AggregateId::new();
        let batch = vec![
            event(TenantId::new(), item, "inventory.item"),
            event(TenantId::new(), item, "inventory.item"),
        ];

        let err = store.append(batch, ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));
    }

    #[test]
    fn streams_keep_their_aggregate_type() {
        let store = InMemoryEventStore::new();
        let tenant = TenantId::new();
        let id = AggregateId::new();

        store.append(vec![event(tenant, id, "sales.order")], ExpectedVersion::Any).unwrap();
        let err = store
            .append(vec![event(tenant, id, "inventory.item")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn load_by_type_stays_inside_one_business() {
        let store = InMemoryEventStore::new();
        let mine = TenantId::new();
        let other = TenantId::new();

        store.append(vec![event(mine, AggregateId::new(), "inventory.item")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(mine, AggregateId::new(), "sales.order")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(other, AggregateId::new(), "inventory.item")], ExpectedVersion::Any).unwrap();

        let loaded = store.load_by_type(mine, "inventory.item").unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.iter().all(|e| e.tenant_id == mine && e.aggregate_type == "inventory.item"));
    }
}
