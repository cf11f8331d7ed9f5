//! Inventory domain module (event-sourced).
//!
//! Stock per store item, its low-stock threshold, and the classification the
//! reorder workflows key off. No IO, no HTTP, no storage.

pub mod item;
pub mod status;

pub use item::{
    AdjustStock, CreateItem, InventoryCommand, InventoryEvent, InventoryItem, InventoryItemId,
    ItemCreated, SetThreshold, StockAdjusted, ThresholdChanged,
};
pub use status::StockStatus;
