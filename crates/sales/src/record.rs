use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glowdesk_core::{StoreId, UserId};

use crate::order::SalesOrderId;

/// How a sale was made: a first purchase (`open`) or an add-on to an existing
/// client's purchase (`upsell`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    Open,
    Upsell,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Open => "open",
            SaleType::Upsell => "upsell",
        }
    }
}

/// Flat sales row as kept by the sales ledger read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub order_id: SalesOrderId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub sale_type: SaleType,
    pub total: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub voided: bool,
}
