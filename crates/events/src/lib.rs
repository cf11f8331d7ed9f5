//! Event primitives: domain events, envelopes, the pub/sub bus and the
//! realtime row-change feed keyed by business.

pub mod bus;
pub mod change;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use change::{ChangeKind, RowChange};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::TenantScoped;
