use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glowdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use glowdesk_events::Event;

use crate::tier::{CommissionTier, TierScope, validate_tiers};

/// Aggregate root: the commission tier schedule of one role or employee.
///
/// There is one stream per `(business, scope)`; its id is derived from the
/// scope, so writers never need to look it up first. Replacing the schedule
/// is a single event, so readers see either the old tiers or the new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSchedule {
    id: AggregateId,
    tenant_id: Option<TenantId>,
    scope: Option<TierScope>,
    tiers: Vec<CommissionTier>,
    version: u64,
}

impl TierSchedule {
    pub fn empty(id: AggregateId) -> Self {
        Self {
            id,
            tenant_id: None,
            scope: None,
            tiers: Vec::new(),
            version: 0,
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn scope(&self) -> Option<&TierScope> {
        self.scope.as_ref()
    }

    /// Tiers ordered by `tier_number`.
    pub fn tiers(&self) -> &[CommissionTier] {
        &self.tiers
    }
}

impl AggregateRoot for TierSchedule {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReplaceTiers (the whole schedule at once).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceTiers {
    pub tenant_id: TenantId,
    pub scope: TierScope,
    pub tiers: Vec<CommissionTier>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearTiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearTiers {
    pub tenant_id: TenantId,
    pub scope: TierScope,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierScheduleCommand {
    ReplaceTiers(ReplaceTiers),
    ClearTiers(ClearTiers),
}

/// Event: TiersReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiersReplaced {
    pub tenant_id: TenantId,
    pub scope: TierScope,
    pub tiers: Vec<CommissionTier>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TiersCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiersCleared {
    pub tenant_id: TenantId,
    pub scope: TierScope,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierScheduleEvent {
    TiersReplaced(TiersReplaced),
    TiersCleared(TiersCleared),
}

impl TierScheduleEvent {
    pub fn scope(&self) -> &TierScope {
        match self {
            TierScheduleEvent::TiersReplaced(e) => &e.scope,
            TierScheduleEvent::TiersCleared(e) => &e.scope,
        }
    }
}

impl Event for TierScheduleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TierScheduleEvent::TiersReplaced(_) => "commissions.tiers.replaced",
            TierScheduleEvent::TiersCleared(_) => "commissions.tiers.cleared",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TierScheduleEvent::TiersReplaced(e) => e.occurred_at,
            TierScheduleEvent::TiersCleared(e) => e.occurred_at,
        }
    }
}

impl Aggregate for TierSchedule {
    type Command = TierScheduleCommand;
    type Event = TierScheduleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TierScheduleEvent::TiersReplaced(e) => {
                self.tenant_id = Some(e.tenant_id);
                self.scope = Some(e.scope.clone());
                let mut tiers = e.tiers.clone();
                tiers.sort_by_key(|t| t.tier_number);
                self.tiers = tiers;
            }
            TierScheduleEvent::TiersCleared(e) => {
                self.tenant_id = Some(e.tenant_id);
                self.scope = Some(e.scope.clone());
                self.tiers.clear();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TierScheduleCommand::ReplaceTiers(cmd) => self.handle_replace(cmd),
            TierScheduleCommand::ClearTiers(cmd) => self.handle_clear(cmd),
        }
    }
}

impl TierSchedule {
    fn ensure_stream(&self, tenant_id: TenantId, scope: &TierScope) -> Result<(), DomainError> {
        if scope.aggregate_id(tenant_id) != self.id {
            return Err(DomainError::invariant("scope does not match schedule id"));
        }
        if self.tenant_id.is_some_and(|t| t != tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn handle_replace(&self, cmd: &ReplaceTiers) -> Result<Vec<TierScheduleEvent>, DomainError> {
        self.ensure_stream(cmd.tenant_id, &cmd.scope)?;
        validate_tiers(&cmd.tiers)?;

        Ok(vec![TierScheduleEvent::TiersReplaced(TiersReplaced {
            tenant_id: cmd.tenant_id,
            scope: cmd.scope.clone(),
            tiers: cmd.tiers.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear(&self, cmd: &ClearTiers) -> Result<Vec<TierScheduleEvent>, DomainError> {
        self.ensure_stream(cmd.tenant_id, &cmd.scope)?;
        if self.tiers.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![TierScheduleEvent::TiersCleared(TiersCleared {
            tenant_id: cmd.tenant_id,
            scope: cmd.scope.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{RoleType, tier};
    use glowdesk_events::execute;

    fn role_scope() -> TierScope {
        TierScope::Role(RoleType::new("esthetician").unwrap())
    }

    #[test]
    fn replace_emits_single_event_with_all_tiers() {
        let tenant_id = TenantId::new();
        let scope = role_scope();
        let mut schedule = TierSchedule::empty(scope.aggregate_id(tenant_id));

        let events = execute(
            &mut schedule,
            &TierScheduleCommand::ReplaceTiers(ReplaceTiers {
                tenant_id,
                scope,
                tiers: vec![tier(2, 1000, 8), tier(1, 0, 5)],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(schedule.version(), 1);
        let numbers: Vec<u32> = schedule.tiers().iter().map(|t| t.tier_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn invalid_replacement_leaves_previous_schedule_untouched() {
        let tenant_id = TenantId::new();
        let scope = role_scope();
        let mut schedule = TierSchedule::empty(scope.aggregate_id(tenant_id));
        execute(
            &mut schedule,
            &TierScheduleCommand::ReplaceTiers(ReplaceTiers {
                tenant_id,
                scope: scope.clone(),
                tiers: vec![tier(1, 0, 5)],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let mut bad = tier(2, 1000, 8);
        bad.commission_rate = rust_decimal::Decimal::from(2);
        let err = execute(
            &mut schedule,
            &TierScheduleCommand::ReplaceTiers(ReplaceTiers {
                tenant_id,
                scope,
                tiers: vec![tier(1, 0, 5), bad],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(schedule.tiers().len(), 1);
        assert_eq!(schedule.version(), 1);
    }

    #[test]
    fn scope_must_match_stream() {
        let tenant_id = TenantId::new();
        let schedule = TierSchedule::empty(AggregateId::new());
        let err = schedule
            .handle(&TierScheduleCommand::ReplaceTiers(ReplaceTiers {
                tenant_id,
                scope: role_scope(),
                tiers: vec![],
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn clearing_an_empty_schedule_is_a_no_op() {
        let tenant_id = TenantId::new();
        let scope = role_scope();
        let schedule = TierSchedule::empty(scope.aggregate_id(tenant_id));
        let events = schedule
            .handle(&TierScheduleCommand::ClearTiers(ClearTiers {
                tenant_id,
                scope,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }
}
