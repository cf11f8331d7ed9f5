//! Commission engine.
//!
//! Tier schedules are stored per business and scope (a role, or one
//! employee). Resolution is pure: given tiers and a period-to-date sales
//! total, pick the highest tier whose target has been met.

pub mod resolver;
pub mod schedule;
pub mod summary;
pub mod tier;

pub use resolver::{NextTier, effective_tiers, estimate_commission, next_tier, resolve_rate, resolve_tier};
pub use schedule::{
    ClearTiers, ReplaceTiers, TierSchedule, TierScheduleCommand, TierScheduleEvent, TiersCleared,
    TiersReplaced,
};
pub use summary::CommissionSummary;
pub use tier::{CommissionTier, RoleType, TierScope, schedule_period, validate_tiers};
