use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glowdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, StoreId, TenantId};
use glowdesk_events::Event;

use crate::status::StockStatus;

/// Inventory item identifier (business-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub AggregateId);

impl InventoryItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: a product stocked at one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    tenant_id: Option<TenantId>,
    store_id: Option<StoreId>,
    name: String,
    quantity_on_hand: i64,
    low_stock_threshold: i64,
    version: u64,
    created: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            tenant_id: None,
            store_id: None,
            name: String::new(),
            quantity_on_hand: 0,
            low_stock_threshold: 0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity_on_hand(&self) -> i64 {
        self.quantity_on_hand
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    pub fn status(&self) -> StockStatus {
        StockStatus::classify(self.quantity_on_hand, self.low_stock_threshold)
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem. Items start with zero stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub store_id: StoreId,
    pub name: String,
    pub low_stock_threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (receipts are positive, sales and shrinkage negative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetThreshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetThreshold {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub low_stock_threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateItem(CreateItem),
    AdjustStock(AdjustStock),
    SetThreshold(SetThreshold),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub store_id: StoreId,
    pub name: String,
    pub low_stock_threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ThresholdChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdChanged {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub low_stock_threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    StockAdjusted(StockAdjusted),
    ThresholdChanged(ThresholdChanged),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::StockAdjusted(_) => "inventory.item.stock_adjusted",
            InventoryEvent::ThresholdChanged(_) => "inventory.item.threshold_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemCreated(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::ThresholdChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemCreated(e) => {
                self.id = e.item_id;
                self.tenant_id = Some(e.tenant_id);
                self.store_id = Some(e.store_id);
                self.name = e.name.clone();
                self.quantity_on_hand = 0;
                self.low_stock_threshold = e.low_stock_threshold;
                self.created = true;
            }
            InventoryEvent::StockAdjusted(e) => {
                self.quantity_on_hand += e.delta;
            }
            InventoryEvent::ThresholdChanged(e) => {
                self.low_stock_threshold = e.low_stock_threshold;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateItem(cmd) => self.handle_create(cmd),
            InventoryCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
            InventoryCommand::SetThreshold(cmd) => self.handle_set_threshold(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_existing(&self, tenant_id: TenantId, item_id: InventoryItemId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        if cmd.item_id != self.id {
            return Err(DomainError::invariant("item_id mismatch"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.low_stock_threshold < 0 {
            return Err(DomainError::validation("low_stock_threshold must not be negative"));
        }

        Ok(vec![InventoryEvent::ItemCreated(ItemCreated {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            store_id: cmd.store_id,
            name: name.to_string(),
            low_stock_threshold: cmd.low_stock_threshold,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.item_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta must be non-zero"));
        }

        let new_qty = self
            .quantity_on_hand
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("stock overflow"))?;
        if new_qty < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![InventoryEvent::StockAdjusted(StockAdjusted {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_threshold(&self, cmd: &SetThreshold) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.item_id)?;

        if cmd.low_stock_threshold < 0 {
            return Err(DomainError::validation("low_stock_threshold must not be negative"));
        }
        if cmd.low_stock_threshold == self.low_stock_threshold {
            return Ok(Vec::new());
        }

        Ok(vec![InventoryEvent::ThresholdChanged(ThresholdChanged {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            low_stock_threshold: cmd.low_stock_threshold,
            occurred_at: cmd.occurred_at,
        })])
    }
}
