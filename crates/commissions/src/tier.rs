use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glowdesk_core::{DomainError, TenantId, UserId, AggregateId, ValueObject};
use glowdesk_sales::Period;

/// Job role a tier schedule applies to (e.g. `esthetician`, `sales_associate`).
///
/// Stored lowercase and trimmed so `"Esthetician "` and `"esthetician"` name
/// the same schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleType(String);

impl RoleType {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("role_type cannot be empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleType> for String {
    fn from(value: RoleType) -> Self {
        value.0
    }
}

impl core::fmt::Display for RoleType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a tier schedule belongs to. Exactly one of role or employee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TierScope {
    Role(RoleType),
    Employee(UserId),
}

impl TierScope {
    /// Stable key used to derive the schedule's stream id.
    pub fn key(&self) -> String {
        match self {
            TierScope::Role(role) => format!("commission-tiers:role:{role}"),
            TierScope::Employee(user) => format!("commission-tiers:user:{user}"),
        }
    }

    pub fn aggregate_id(&self, tenant_id: TenantId) -> AggregateId {
        AggregateId::derived(tenant_id, &self.key())
    }
}

/// One commission bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub tier_number: u32,
    pub name: String,
    pub target_amount: Decimal,
    /// Fraction of sales paid out, `0..=1` (shown as a percentage).
    pub commission_rate: Decimal,
    pub target_period: Period,
}

impl ValueObject for CommissionTier {}

impl CommissionTier {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "tier {} name cannot be empty",
                self.tier_number
            )));
        }
        if self.target_amount < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "tier {} target_amount must not be negative",
                self.tier_number
            )));
        }
        if self.commission_rate < Decimal::ZERO || self.commission_rate > Decimal::ONE {
            return Err(DomainError::validation(format!(
                "tier {} commission_rate must be between 0 and 1",
                self.tier_number
            )));
        }
        Ok(())
    }
}

/// Validate a full schedule before it replaces the stored one.
pub fn validate_tiers(tiers: &[CommissionTier]) -> Result<(), DomainError> {
    let mut numbers = HashSet::new();
    let mut targets = HashSet::new();

    for tier in tiers {
        tier.validate()?;

        if !numbers.insert(tier.tier_number) {
            return Err(DomainError::validation(format!(
                "duplicate tier_number {}",
                tier.tier_number
            )));
        }
        // Decimal equality ignores scale, so 1000 and 1000.00 collide here.
        if !targets.insert(tier.target_amount.normalize()) {
            return Err(DomainError::validation(format!(
                "duplicate target_amount {}",
                tier.target_amount
            )));
        }
    }

    if let Some(first) = tiers.first() {
        if tiers.iter().any(|t| t.target_period != first.target_period) {
            return Err(DomainError::validation(
                "all tiers in a schedule must share one target_period",
            ));
        }
    }

    Ok(())
}

/// Period a schedule is measured over; monthly when the schedule is empty.
pub fn schedule_period(tiers: &[CommissionTier]) -> Period {
    tiers
        .first()
        .map(|t| t.target_period)
        .unwrap_or(Period::Monthly)
}

#[cfg(test)]
pub(crate) fn tier(tier_number: u32, target: i64, rate_pct: i64) -> CommissionTier {
    CommissionTier {
        tier_number,
        name: format!("Tier {tier_number}"),
        target_amount: Decimal::from(target),
        commission_rate: Decimal::new(rate_pct, 2),
        target_period: Period::Monthly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_type_is_normalized() {
        assert_eq!(RoleType::new(" Esthetician ").unwrap().as_str(), "esthetician");
        assert!(RoleType::new("   ").is_err());
    }

    #[test]
    fn scope_ids_differ_between_role_and_employee() {
        let tenant = TenantId::new();
        let role = TierScope::Role(RoleType::new("esthetician").unwrap());
        let user = TierScope::Employee(UserId::new());
        assert_ne!(role.aggregate_id(tenant), user.aggregate_id(tenant));
        assert_eq!(role.aggregate_id(tenant), role.clone().aggregate_id(tenant));
    }

    #[test]
    fn rejects_out_of_range_rate_and_negative_target() {
        let mut t = tier(1, 0, 5);
        t.commission_rate = Decimal::new(15, 1);
        assert!(matches!(validate_tiers(&[t]), Err(DomainError::Validation(_))));

        let mut t = tier(1, 0, 5);
        t.target_amount = Decimal::from(-1);
        assert!(validate_tiers(&[t]).is_err());
    }

    #[test]
    fn rejects_duplicate_numbers_targets_and_mixed_periods() {
        assert!(validate_tiers(&[tier(1, 0, 5), tier(1, 1000, 8)]).is_err());

        let mut same_target = tier(2, 0, 8);
        same_target.target_amount = Decimal::new(0, 2);
        assert!(validate_tiers(&[tier(1, 0, 5), same_target]).is_err());

        let mut weekly = tier(2, 1000, 8);
        weekly.target_period = Period::Weekly;
        assert!(validate_tiers(&[tier(1, 0, 5), weekly]).is_err());
    }

    #[test]
    fn accepts_well_formed_schedule() {
        assert!(validate_tiers(&[tier(1, 0, 5), tier(2, 1000, 8), tier(3, 5000, 12)]).is_ok());
        assert!(validate_tiers(&[]).is_ok());
    }
}
