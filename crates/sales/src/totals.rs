//! Sales aggregation: the single reduction from sales rows to totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glowdesk_core::{StoreId, UserId};

use crate::period::DateWindow;
use crate::record::{SaleRecord, SaleType};

/// Which sales rows count toward a total.
///
/// Voided sales never count unless `include_voided` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesFilter {
    pub window: Option<DateWindow>,
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub sale_type: Option<SaleType>,
    pub include_voided: bool,
}

impl SalesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn of_type(mut self, sale_type: SaleType) -> Self {
        self.sale_type = Some(sale_type);
        self
    }

    pub fn matches(&self, record: &SaleRecord) -> bool {
        if record.voided && !self.include_voided {
            return false;
        }
        if let Some(w) = &self.window {
            if !w.contains(record.occurred_at) {
                return false;
            }
        }
        if self.user_id.is_some_and(|u| u != record.user_id) {
            return false;
        }
        if self.store_id.is_some_and(|s| s != record.store_id) {
            return false;
        }
        if self.sale_type.is_some_and(|t| t != record.sale_type) {
            return false;
        }
        true
    }
}

/// Aggregated sales for a filter. Sums saturate at `Decimal::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub total: Decimal,
    pub open: Decimal,
    pub upsell: Decimal,
    pub count: u64,
}

impl SalesTotals {
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a SaleRecord>,
        filter: &SalesFilter,
    ) -> Self {
        records
            .into_iter()
            .filter(|r| filter.matches(r))
            .fold(SalesTotals::default(), |mut acc, r| {
                acc.total = acc.total.saturating_add(r.total);
                match r.sale_type {
                    SaleType::Open => acc.open = acc.open.saturating_add(r.total),
                    SaleType::Upsell => acc.upsell = acc.upsell.saturating_add(r.total),
                }
                acc.count = acc.count.saturating_add(1);
                acc
            })
    }
}
