//! Goal progress: how far along a goal is and the pace needed to hit it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use glowdesk_core::{StoreId, UserId};
use glowdesk_sales::{DateWindow, SaleRecord, SalesFilter, SalesTotals};

use crate::goal::{GoalTarget, PositionType, SalesGoal};

const SECONDS_PER_DAY: i64 = 86_400;

/// The parts of a goal that decide which sales count toward it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalCriteria {
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub position_type: Option<PositionType>,
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
}

impl GoalCriteria {
    /// Dates are inclusive: a goal ending on the 31st counts sales made on the 31st.
    pub fn window(&self) -> DateWindow {
        DateWindow::for_dates(self.start_date, self.end_date)
    }

    pub fn filter(&self) -> SalesFilter {
        let mut filter = SalesFilter::new().within(self.window());
        if let Some(user) = self.user_id {
            filter = filter.for_user(user);
        }
        if let Some(store) = self.store_id {
            filter = filter.for_store(store);
        }
        if let Some(position) = self.position_type {
            filter = filter.of_type(position.sale_type());
        }
        filter
    }
}

impl SalesGoal {
    pub fn criteria(&self) -> GoalCriteria {
        GoalCriteria {
            target: self.target(),
            start_date: self.start_date(),
            end_date: self.end_date(),
            position_type: self.position_type(),
            user_id: self.user_id(),
            store_id: self.store_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub current: Decimal,
    pub target: Decimal,
    /// `0..=100`, truncated to two decimal places.
    pub progress_percentage: Decimal,
    pub days_remaining: u64,
    /// Amount (or count) per remaining day still needed. Zero once the goal
    /// is met or its window has closed.
    pub daily_needed: Decimal,
    pub is_met: bool,
}

impl GoalProgress {
    pub fn compute<'a>(
        criteria: &GoalCriteria,
        records: impl IntoIterator<Item = &'a SaleRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let totals = SalesTotals::from_records(records, &criteria.filter());
        let current = match criteria.target {
            GoalTarget::Amount(_) => totals.total,
            GoalTarget::Count(_) => Decimal::from(totals.count),
        };
        let target = criteria.target.as_decimal();
        let days_remaining = days_remaining(criteria.end_date, now);

        Self {
            current,
            target,
            progress_percentage: progress_percentage(current, target),
            days_remaining,
            daily_needed: daily_needed(current, target, days_remaining, criteria.target.pace_scale()),
            is_met: current >= target,
        }
    }
}

/// `current / target * 100`, clamped to `[0, 100]` and truncated to two
/// places. Reads 100 only once `current >= target`. A zero target is met.
pub fn progress_percentage(current: Decimal, target: Decimal) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    if target <= Decimal::ZERO || current >= target {
        return hundred;
    }
    let raw = current
        .checked_div(target)
        .and_then(|ratio| ratio.checked_mul(hundred))
        .unwrap_or(Decimal::ZERO);
    raw.clamp(Decimal::ZERO, hundred)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero)
        .min(Decimal::new(9_999, 2))
}

/// Whole days (rounded up) until the end of `end_date`; never negative.
pub fn days_remaining(end_date: NaiveDate, now: DateTime<Utc>) -> u64 {
    let deadline = DateWindow::for_dates(end_date, end_date).end;
    let seconds = (deadline - now).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    let days = seconds / SECONDS_PER_DAY + i64::from(seconds % SECONDS_PER_DAY != 0);
    days as u64
}

/// Remaining amount spread over the remaining days, rounded up to `scale`
/// places so that keeping the pace meets the goal. Exactly zero when no
/// days remain.
pub fn daily_needed(current: Decimal, target: Decimal, days_remaining: u64, scale: u32) -> Decimal {
    if days_remaining == 0 {
        return Decimal::ZERO;
    }
    let remaining = target.saturating_sub(current).max(Decimal::ZERO);
    (remaining / Decimal::from(days_remaining))
        .round_dp_with_strategy(scale, RoundingStrategy::ToPositiveInfinity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use glowdesk_core::AggregateId;
    use glowdesk_sales::{SaleType, SalesOrderId};
    use proptest::prelude::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn sale(sale_type: SaleType, amount: i64, at: DateTime<Utc>) -> SaleRecord {
        SaleRecord {
            order_id: SalesOrderId::new(AggregateId::new()),
            store_id: StoreId::new(),
            user_id: UserId::new(),
            sale_type,
            total: Decimal::from(amount),
            occurred_at: at,
            voided: false,
        }
    }

    fn criteria(target: GoalTarget) -> GoalCriteria {
        GoalCriteria {
            target,
            start_date: d(10, 1),
            end_date: d(10, 31),
            position_type: None,
            user_id: None,
            store_id: None,
        }
    }

    #[test]
    fn amount_goal_progress_and_pace() {
        let now = Utc.with_ymd_and_hms(2026, 10, 22, 0, 0, 0).unwrap();
        let records = vec![
            sale(SaleType::Open, 2500, Utc.with_ymd_and_hms(2026, 10, 5, 12, 0, 0).unwrap()),
            sale(SaleType::Upsell, 500, Utc.with_ymd_and_hms(2026, 10, 31, 23, 0, 0).unwrap()),
            sale(SaleType::Open, 9999, Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()),
        ];

        let progress =
            GoalProgress::compute(&criteria(GoalTarget::Amount(Decimal::from(10_000))), &records, now);

        assert_eq!(progress.current, Decimal::from(3000));
        assert_eq!(progress.progress_percentage, Decimal::from(30));
        assert_eq!(progress.days_remaining, 10);
        assert_eq!(progress.daily_needed, Decimal::from(700));
        assert!(!progress.is_met);
    }

    #[test]
    fn position_type_restricts_sale_type_and_count_goals_count_rows() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 10, 12, 0, 0).unwrap();
        let records = vec![
            sale(SaleType::Open, 100, at),
            sale(SaleType::Upsell, 100, at),
            sale(SaleType::Upsell, 100, at),
        ];
        let mut c = criteria(GoalTarget::Count(4));
        c.position_type = Some(PositionType::Upseller);

        let progress = GoalProgress::compute(&c, &records, now);
        assert_eq!(progress.current, Decimal::from(2));
        assert_eq!(progress.progress_percentage, Decimal::from(50));
    }

    #[test]
    fn overshoot_is_clamped_and_pace_is_zero() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        let records = vec![sale(SaleType::Open, 5000, now)];
        let progress =
            GoalProgress::compute(&criteria(GoalTarget::Amount(Decimal::from(1000))), &records, now);
        assert_eq!(progress.progress_percentage, Decimal::ONE_HUNDRED);
        assert_eq!(progress.daily_needed, Decimal::ZERO);
        assert!(progress.is_met);
    }

    #[test]
    fn past_goal_has_no_days_and_zero_pace() {
        let now = Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap();
        let progress =
            GoalProgress::compute(&criteria(GoalTarget::Amount(Decimal::from(1000))), &[], now);
        assert_eq!(progress.days_remaining, 0);
        assert_eq!(progress.daily_needed, Decimal::ZERO);
    }

    #[test]
    fn partial_day_counts_as_a_day() {
        let now = Utc.with_ymd_and_hms(2026, 10, 31, 18, 0, 0).unwrap();
        assert_eq!(days_remaining(d(10, 31), now), 1);
        let midnight = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(days_remaining(d(10, 31), midnight), 0);
    }

    #[test]
    fn percentage_reads_100_only_when_met() {
        let pct = progress_percentage(Decimal::from(99_999), Decimal::from(100_000));
        assert_eq!(pct, Decimal::new(9_999, 2));
        assert!(pct < Decimal::ONE_HUNDRED);

        let barely = progress_percentage(
            Decimal::from_str_exact("99999.9999").unwrap(),
            Decimal::from(100_000),
        );
        assert_eq!(barely, Decimal::new(9_999, 2));

        assert_eq!(progress_percentage(Decimal::from(2), Decimal::from(3)), Decimal::new(6_666, 2));
        assert_eq!(
            progress_percentage(Decimal::from(100_000), Decimal::from(100_000)),
            Decimal::ONE_HUNDRED
        );
    }

    #[test]
    fn count_goal_pace_is_whole_sales() {
        let now = Utc.with_ymd_and_hms(2026, 10, 29, 0, 0, 0).unwrap();
        let progress = GoalProgress::compute(&criteria(GoalTarget::Count(10)), &[], now);
        assert_eq!(progress.days_remaining, 3);
        assert_eq!(progress.daily_needed, Decimal::from(4));

        assert_eq!(
            daily_needed(Decimal::ZERO, Decimal::from(1000), 3, 2),
            Decimal::new(33_334, 2)
        );
    }

    #[test]
    fn last_representable_end_date_still_counts_days() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert!(days_remaining(NaiveDate::MAX, now) > 0);

        let mut c = criteria(GoalTarget::Count(5));
        c.end_date = NaiveDate::MAX;
        let progress = GoalProgress::compute(&c, &[], now);
        assert!(progress.days_remaining > 0);
        assert_eq!(progress.daily_needed, Decimal::ONE);
    }

    #[test]
    fn zero_target_counts_as_met() {
        assert_eq!(progress_percentage(Decimal::ZERO, Decimal::ZERO), Decimal::ONE_HUNDRED);
    }

    proptest! {
        #[test]
        fn percentage_is_clamped(current in 0i64..10_000_000, target in 0i64..10_000_000) {
            let pct = progress_percentage(Decimal::new(current, 2), Decimal::new(target, 2));
            prop_assert!(pct >= Decimal::ZERO);
            prop_assert!(pct <= Decimal::ONE_HUNDRED);
            prop_assert_eq!(pct == Decimal::ONE_HUNDRED, current >= target);
        }

        #[test]
        fn days_remaining_never_negative_and_zero_after_end(
            offset_days in -400i64..400,
            offset_secs in 0i64..86_400,
        ) {
            let end = d(6, 15);
            let now = DateWindow::for_dates(end, end).end
                + chrono::Duration::days(offset_days)
                + chrono::Duration::seconds(offset_secs);
            let days = days_remaining(end, now);
            if offset_days >= 0 {
                prop_assert_eq!(days, 0);
            } else {
                prop_assert!(days > 0);
            }
        }

        #[test]
        fn pace_is_finite_and_zero_without_days(
            current in 0i64..10_000_000,
            target in 0i64..10_000_000,
            days in 0u64..400,
        ) {
            let pace = daily_needed(Decimal::new(current, 2), Decimal::new(target, 2), days, 2);
            prop_assert!(pace >= Decimal::ZERO);
            if days == 0 {
                prop_assert_eq!(pace, Decimal::ZERO);
            }
        }
    }
}
