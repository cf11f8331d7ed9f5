use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glowdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, StoreId, TenantId, UserId};
use glowdesk_events::Event;

use crate::record::{SaleRecord, SaleType};

/// Largest total a single sale may carry.
pub fn max_sale_total() -> Decimal {
    Decimal::from(1_000_000_000_i64)
}

/// Sales order identifier (business-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesOrderId(pub AggregateId);

impl SalesOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SalesOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: a completed POS sale.
///
/// A sale is recorded once and can later be voided. Voided sales stay in the
/// ledger but no longer count toward commissions or goals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrder {
    id: SalesOrderId,
    tenant_id: Option<TenantId>,
    store_id: Option<StoreId>,
    user_id: Option<UserId>,
    sale_type: SaleType,
    total: Decimal,
    occurred_at: Option<DateTime<Utc>>,
    voided: bool,
    version: u64,
    created: bool,
}

impl SalesOrder {
    /// Create an empty, not-yet-recorded aggregate instance for rehydration.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            store_id: None,
            user_id: None,
            sale_type: SaleType::Open,
            total: Decimal::ZERO,
            occurred_at: None,
            voided: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn sale_type(&self) -> SaleType {
        self.sale_type
    }

    pub fn is_voided(&self) -> bool {
        self.voided
    }

    pub fn is_recorded(&self) -> bool {
        self.created
    }

    /// Flat ledger row for this sale; `None` until the sale has been recorded.
    pub fn to_record(&self) -> Option<SaleRecord> {
        if !self.created {
            return None;
        }
        Some(SaleRecord {
            order_id: self.id,
            store_id: self.store_id?,
            user_id: self.user_id?,
            sale_type: self.sale_type,
            total: self.total,
            occurred_at: self.occurred_at?,
            voided: self.voided,
        })
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub sale_type: SaleType,
    pub total: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: VoidSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidSale {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    RecordSale(RecordSale),
    VoidSale(VoidSale),
}

/// Event: SaleRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecorded {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub sale_type: SaleType,
    pub total: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SaleVoided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleVoided {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SaleRecorded(SaleRecorded),
    SaleVoided(SaleVoided),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SaleRecorded(_) => "sales.order.recorded",
            SalesOrderEvent::SaleVoided(_) => "sales.order.voided",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SaleRecorded(e) => e.occurred_at,
            SalesOrderEvent::SaleVoided(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SaleRecorded(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.store_id = Some(e.store_id);
                self.user_id = Some(e.user_id);
                self.sale_type = e.sale_type;
                self.total = e.total;
                self.occurred_at = Some(e.occurred_at);
                self.voided = false;
                self.created = true;
            }
            SalesOrderEvent::SaleVoided(_) => {
                self.voided = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesOrderCommand::RecordSale(cmd) => self.handle_record(cmd),
            SalesOrderCommand::VoidSale(cmd) => self.handle_void(cmd),
        }
    }
}

impl SalesOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: SalesOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_record(&self, cmd: &RecordSale) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sale already recorded"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.total < Decimal::ZERO {
            return Err(DomainError::validation("total must not be negative"));
        }
        if cmd.total > max_sale_total() {
            return Err(DomainError::validation("total exceeds the per-sale maximum"));
        }

        Ok(vec![SalesOrderEvent::SaleRecorded(SaleRecorded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            store_id: cmd.store_id,
            user_id: cmd.user_id,
            sale_type: cmd.sale_type,
            total: cmd.total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_void(&self, cmd: &VoidSale) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.voided {
            return Err(DomainError::invariant("sale is already voided"));
        }

        Ok(vec![SalesOrderEvent::SaleVoided(SaleVoided {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowdesk_events::execute;

    fn record_cmd(tenant_id: TenantId, order_id: SalesOrderId, total: Decimal) -> RecordSale {
        RecordSale {
            tenant_id,
            order_id,
            store_id: StoreId::new(),
            user_id: UserId::new(),
            sale_type: SaleType::Upsell,
            total,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn record_sale_emits_sale_recorded_event() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let order = SalesOrder::empty(order_id);
        let tenant_id = TenantId::new();

        let events = order
            .handle(&SalesOrderCommand::RecordSale(record_cmd(
                tenant_id,
                order_id,
                Decimal::new(12_500, 2),
            )))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            SalesOrderEvent::SaleRecorded(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.total, Decimal::new(12_500, 2));
                assert_eq!(e.sale_type, SaleType::Upsell);
            }
            _ => panic!("Expected SaleRecorded event"),
        }
    }

    #[test]
    fn zero_total_is_allowed_but_negative_is_not() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let order = SalesOrder::empty(order_id);
        let tenant_id = TenantId::new();

        assert!(order
            .handle(&SalesOrderCommand::RecordSale(record_cmd(tenant_id, order_id, Decimal::ZERO)))
            .is_ok());

        let err = order
            .handle(&SalesOrderCommand::RecordSale(record_cmd(
                tenant_id,
                order_id,
                Decimal::new(-1, 2),
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn total_above_per_sale_maximum_is_rejected() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let order = SalesOrder::empty(order_id);
        let tenant_id = TenantId::new();

        assert!(order
            .handle(&SalesOrderCommand::RecordSale(record_cmd(tenant_id, order_id, max_sale_total())))
            .is_ok());

        let err = order
            .handle(&SalesOrderCommand::RecordSale(record_cmd(tenant_id, order_id, Decimal::MAX)))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cannot_record_twice() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let mut order = SalesOrder::empty(order_id);
        let tenant_id = TenantId::new();
        let cmd = SalesOrderCommand::RecordSale(record_cmd(tenant_id, order_id, Decimal::ONE));

        execute(&mut order, &cmd).unwrap();
        let err = order.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn void_marks_record_voided_and_rejects_second_void() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let mut order = SalesOrder::empty(order_id);
        let tenant_id = TenantId::new();

        execute(
            &mut order,
            &SalesOrderCommand::RecordSale(record_cmd(tenant_id, order_id, Decimal::new(4000, 0))),
        )
        .unwrap();

        let void = SalesOrderCommand::VoidSale(VoidSale {
            tenant_id,
            order_id,
            reason: Some("refunded".to_string()),
            occurred_at: Utc::now(),
        });
        execute(&mut order, &void).unwrap();

        assert!(order.is_voided());
        assert_eq!(order.version(), 2);
        assert!(order.to_record().unwrap().voided);

        let err = order.handle(&void).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn void_of_unknown_sale_is_not_found() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let order = SalesOrder::empty(order_id);
        let err = order
            .handle(&SalesOrderCommand::VoidSale(VoidSale {
                tenant_id: TenantId::new(),
                order_id,
                reason: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn void_from_other_tenant_is_rejected() {
        let order_id = SalesOrderId::new(AggregateId::new());
        let mut order = SalesOrder::empty(order_id);
        execute(
            &mut order,
            &SalesOrderCommand::RecordSale(record_cmd(TenantId::new(), order_id, Decimal::ONE)),
        )
        .unwrap();

        let err = order
            .handle(&SalesOrderCommand::VoidSale(VoidSale {
                tenant_id: TenantId::new(),
                order_id,
                reason: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
