//! Low-stock workflow runtime: rule storage, the trigger, and the outboxes
//! the built-in actions write to.

pub mod actions;
pub mod monitor;
pub mod outbox;
pub mod store;

pub use actions::builtin_registry;
pub use monitor::{LowStockMonitor, MonitorError};
pub use outbox::{Audience, ManagerEmail, Notification, Outboxes, PurchaseRequest, reorder_quantity};
pub use store::{WorkflowStore, WorkflowStoreError};
