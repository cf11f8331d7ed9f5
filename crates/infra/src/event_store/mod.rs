//! Append-only event store boundary.
//!
//! Business-scoped event streams with optimistic concurrency. The in-memory
//! store backs tests and single-node runs; the Postgres store is behind the
//! `postgres` feature.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Stream type names, one per aggregate.
pub mod aggregate_types {
    pub const INVENTORY_ITEM: &str = "inventory.item";
    pub const SALES_ORDER: &str = "sales.order";
    pub const TIER_SCHEDULE: &str = "commissions.tier_schedule";
    pub const SALES_GOAL: &str = "goals.sales_goal";
}
