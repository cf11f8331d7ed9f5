use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glowdesk_core::UserId;
use glowdesk_sales::{DateWindow, Period, SaleRecord, SalesFilter, SalesTotals};

use crate::resolver::{NextTier, estimate_commission, next_tier, resolve_tier};
use crate::tier::{CommissionTier, schedule_period};

/// Period-to-date commission picture for one employee.
///
/// This is the one place dashboards get commission numbers from; the tier
/// lookup and the estimate always agree because both come from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub user_id: UserId,
    pub period: Period,
    pub window: DateWindow,
    pub sales: SalesTotals,
    pub applied_tier: Option<CommissionTier>,
    pub commission_rate: Decimal,
    pub estimated_commission: Decimal,
    pub next_tier: Option<NextTier>,
}

impl CommissionSummary {
    /// `tiers` are the employee's effective tiers (see `effective_tiers`).
    pub fn compute<'a>(
        user_id: UserId,
        tiers: &[CommissionTier],
        records: impl IntoIterator<Item = &'a SaleRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let period = schedule_period(tiers);
        let window = period.window_containing(now);
        let filter = SalesFilter::new().within(window).for_user(user_id);
        let sales = SalesTotals::from_records(records, &filter);

        let applied_tier = resolve_tier(tiers, sales.total).cloned();
        let commission_rate = applied_tier
            .as_ref()
            .map(|t| t.commission_rate)
            .unwrap_or(Decimal::ZERO);

        Self {
            user_id,
            period,
            window,
            estimated_commission: estimate_commission(sales.total, commission_rate),
            next_tier: next_tier(tiers, sales.total),
            sales,
            applied_tier,
            commission_rate,
        }
    }
}
