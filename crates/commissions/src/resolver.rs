//! Tier resolution: which bracket applies for a sales total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tier::CommissionTier;

/// The tier with the highest `target_amount` that `current_sales` has met.
///
/// Tiers may be in any order. Equal targets (rejected when a schedule is
/// stored, but possible in ad-hoc input) resolve to the higher `tier_number`.
pub fn resolve_tier(tiers: &[CommissionTier], current_sales: Decimal) -> Option<&CommissionTier> {
    tiers
        .iter()
        .filter(|t| t.target_amount <= current_sales)
        .max_by(|a, b| {
            a.target_amount
                .cmp(&b.target_amount)
                .then(a.tier_number.cmp(&b.tier_number))
        })
}

/// Rate for `current_sales`; `0` when no tier qualifies.
pub fn resolve_rate(tiers: &[CommissionTier], current_sales: Decimal) -> Decimal {
    resolve_tier(tiers, current_sales)
        .map(|t| t.commission_rate)
        .unwrap_or(Decimal::ZERO)
}

/// `sales * rate`, exact below `Decimal::MAX`, where it saturates.
pub fn estimate_commission(sales: Decimal, rate: Decimal) -> Decimal {
    sales.checked_mul(rate).unwrap_or(Decimal::MAX)
}

/// Employee-specific tiers replace the role's tiers whenever any exist.
pub fn effective_tiers<'a>(
    employee_tiers: &'a [CommissionTier],
    role_tiers: &'a [CommissionTier],
) -> &'a [CommissionTier] {
    if employee_tiers.is_empty() {
        role_tiers
    } else {
        employee_tiers
    }
}

/// The next bracket above the current sales total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextTier {
    pub tier: CommissionTier,
    pub amount_needed: Decimal,
}

/// Lowest tier whose target is still above `current_sales`.
pub fn next_tier(tiers: &[CommissionTier], current_sales: Decimal) -> Option<NextTier> {
    tiers
        .iter()
        .filter(|t| t.target_amount > current_sales)
        .min_by(|a, b| {
            a.target_amount
                .cmp(&b.target_amount)
                .then(a.tier_number.cmp(&b.tier_number))
        })
        .map(|t| NextTier {
            tier: t.clone(),
            amount_needed: t.target_amount.saturating_sub(current_sales),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::tier;
    use proptest::prelude::*;

    fn standard() -> Vec<CommissionTier> {
        vec![tier(3, 5000, 12), tier(1, 0, 5), tier(2, 1000, 8)]
    }

    #[test]
    fn picks_highest_threshold_met() {
        let tiers = standard();
        let rate = resolve_rate(&tiers, Decimal::from(4000));
        assert_eq!(rate, Decimal::new(8, 2));
        assert_eq!(resolve_tier(&tiers, Decimal::from(4000)).unwrap().tier_number, 2);
    }

    #[test]
    fn threshold_is_inclusive() {
        let tiers = standard();
        assert_eq!(resolve_rate(&tiers, Decimal::from(5000)), Decimal::new(12, 2));
        assert_eq!(resolve_rate(&tiers, Decimal::new(499_999, 2)), Decimal::new(8, 2));
    }

    #[test]
    fn no_qualifying_tier_defaults_to_zero() {
        let tiers = vec![tier(1, 1000, 5)];
        assert_eq!(resolve_tier(&tiers, Decimal::from(999)), None);
        assert_eq!(resolve_rate(&tiers, Decimal::from(999)), Decimal::ZERO);
        assert_eq!(resolve_rate(&[], Decimal::from(10_000)), Decimal::ZERO);
    }

    #[test]
    fn equal_targets_resolve_to_higher_tier_number() {
        let tiers = vec![tier(7, 1000, 9), tier(4, 1000, 6)];
        assert_eq!(resolve_tier(&tiers, Decimal::from(1500)).unwrap().tier_number, 7);
    }

    #[test]
    fn estimate_is_exact() {
        let commission = estimate_commission(Decimal::from(4000), Decimal::new(8, 2));
        assert_eq!(commission, Decimal::new(32_000, 2));
        assert_eq!(commission.to_string(), "320.00");

        let odd = estimate_commission(Decimal::new(33_333, 2), Decimal::new(7, 2));
        assert_eq!(odd, Decimal::new(2_333_31, 4));
    }

    #[test]
    fn employee_tiers_override_role_tiers_when_present() {
        let role = standard();
        let employee = vec![tier(1, 0, 20)];
        assert_eq!(effective_tiers(&employee, &role), employee.as_slice());
        assert_eq!(effective_tiers(&[], &role), role.as_slice());
    }

    #[test]
    fn next_tier_reports_amount_needed() {
        let next = next_tier(&standard(), Decimal::from(4000)).unwrap();
        assert_eq!(next.tier.tier_number, 3);
        assert_eq!(next.amount_needed, Decimal::from(1000));
        assert!(next_tier(&standard(), Decimal::from(5000)).is_none());
    }

    fn arb_tiers() -> impl Strategy<Value = Vec<CommissionTier>> {
        prop::collection::vec((0i64..100_000, 0i64..=100), 0..8).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (target, pct))| tier(i as u32 + 1, target, pct))
                .collect()
        })
    }

    proptest! {
        /// The resolved tier qualifies and no qualifying tier has a higher target.
        #[test]
        fn resolved_tier_is_maximal(tiers in arb_tiers(), cents in 0i64..20_000_000) {
            let sales = Decimal::new(cents, 2);
            match resolve_tier(&tiers, sales) {
                Some(chosen) => {
                    prop_assert!(chosen.target_amount <= sales);
                    for t in &tiers {
                        if t.target_amount <= sales {
                            prop_assert!(t.target_amount <= chosen.target_amount);
                        }
                    }
                }
                None => {
                    prop_assert!(tiers.iter().all(|t| t.target_amount > sales));
                    prop_assert_eq!(resolve_rate(&tiers, sales), Decimal::ZERO);
                }
            }
        }

        /// Input order never changes the outcome.
        #[test]
        fn resolution_ignores_order(tiers in arb_tiers(), cents in 0i64..20_000_000) {
            let sales = Decimal::new(cents, 2);
            let mut reversed = tiers.clone();
            reversed.reverse();
            prop_assert_eq!(
                resolve_tier(&tiers, sales).map(|t| t.tier_number),
                resolve_tier(&reversed, sales).map(|t| t.tier_number)
            );
        }
    }
}
