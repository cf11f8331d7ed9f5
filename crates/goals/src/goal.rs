use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glowdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, StoreId, TenantId, UserId};
use glowdesk_events::Event;
use glowdesk_sales::SaleType;

/// Years a goal's dates may fall in.
pub const GOAL_YEARS: core::ops::RangeInclusive<i32> = 1900..=9999;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesGoalId(pub AggregateId);

impl SalesGoalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SalesGoalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a goal measures: revenue or number of sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GoalTarget {
    Amount(Decimal),
    Count(u64),
}

impl GoalTarget {
    pub fn as_decimal(&self) -> Decimal {
        match self {
            GoalTarget::Amount(a) => *a,
            GoalTarget::Count(c) => Decimal::from(*c),
        }
    }

    /// Decimal places a per-day pace is quoted in: cents, or whole sales.
    pub fn pace_scale(&self) -> u32 {
        match self {
            GoalTarget::Amount(_) => 2,
            GoalTarget::Count(_) => 0,
        }
    }
}

/// Position a goal is aimed at. Openers are measured on `open` sales,
/// upsellers on `upsell` sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Opener,
    Upseller,
}

impl PositionType {
    pub fn sale_type(&self) -> SaleType {
        match self {
            PositionType::Opener => SaleType::Open,
            PositionType::Upseller => SaleType::Upsell,
        }
    }
}

/// Aggregate root: SalesGoal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesGoal {
    id: SalesGoalId,
    tenant_id: Option<TenantId>,
    name: String,
    target: GoalTarget,
    start_date: NaiveDate,
    end_date: NaiveDate,
    position_type: Option<PositionType>,
    user_id: Option<UserId>,
    store_id: Option<StoreId>,
    is_active: bool,
    version: u64,
    created: bool,
}

impl SalesGoal {
    pub fn empty(id: SalesGoalId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            target: GoalTarget::Count(0),
            start_date: NaiveDate::MIN,
            end_date: NaiveDate::MIN,
            position_type: None,
            user_id: None,
            store_id: None,
            is_active: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesGoalId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> GoalTarget {
        self.target
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn position_type(&self) -> Option<PositionType> {
        self.position_type
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for SalesGoal {
    type Id = SalesGoalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SetGoal (create, or redefine an existing goal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetGoal {
    pub tenant_id: TenantId,
    pub goal_id: SalesGoalId,
    pub name: String,
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub position_type: Option<PositionType>,
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateGoal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateGoal {
    pub tenant_id: TenantId,
    pub goal_id: SalesGoalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesGoalCommand {
    SetGoal(SetGoal),
    DeactivateGoal(DeactivateGoal),
}

/// Event: GoalSet. Carries the full definition; the goal becomes active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSet {
    pub tenant_id: TenantId,
    pub goal_id: SalesGoalId,
    pub name: String,
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub position_type: Option<PositionType>,
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoalDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalDeactivated {
    pub tenant_id: TenantId,
    pub goal_id: SalesGoalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesGoalEvent {
    GoalSet(GoalSet),
    GoalDeactivated(GoalDeactivated),
}

impl Event for SalesGoalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesGoalEvent::GoalSet(_) => "goals.goal.set",
            SalesGoalEvent::GoalDeactivated(_) => "goals.goal.deactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesGoalEvent::GoalSet(e) => e.occurred_at,
            SalesGoalEvent::GoalDeactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesGoal {
    type Command = SalesGoalCommand;
    type Event = SalesGoalEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesGoalEvent::GoalSet(e) => {
                self.id = e.goal_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.target = e.target;
                self.start_date = e.start_date;
                self.end_date = e.end_date;
                self.position_type = e.position_type;
                self.user_id = e.user_id;
                self.store_id = e.store_id;
                self.is_active = true;
                self.created = true;
            }
            SalesGoalEvent::GoalDeactivated(_) => {
                self.is_active = false;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesGoalCommand::SetGoal(cmd) => self.handle_set(cmd),
            SalesGoalCommand::DeactivateGoal(cmd) => self.handle_deactivate(cmd),
        }
    }
}

impl SalesGoal {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if self.created && self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_goal_id(&self, goal_id: SalesGoalId) -> Result<(), DomainError> {
        if self.id != goal_id {
            return Err(DomainError::invariant("goal_id mismatch"));
        }
        Ok(())
    }

    fn handle_set(&self, cmd: &SetGoal) -> Result<Vec<SalesGoalEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_goal_id(cmd.goal_id)?;

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("goal name cannot be empty"));
        }
        if !GOAL_YEARS.contains(&cmd.start_date.year()) || !GOAL_YEARS.contains(&cmd.end_date.year()) {
            return Err(DomainError::validation("goal dates must fall between years 1900 and 9999"));
        }
        if cmd.end_date < cmd.start_date {
            return Err(DomainError::validation("end_date must not be before start_date"));
        }
        let positive = match cmd.target {
            GoalTarget::Amount(a) => a > Decimal::ZERO,
            GoalTarget::Count(c) => c > 0,
        };
        if !positive {
            return Err(DomainError::validation("goal target must be positive"));
        }

        Ok(vec![SalesGoalEvent::GoalSet(GoalSet {
            tenant_id: cmd.tenant_id,
            goal_id: cmd.goal_id,
            name: name.to_string(),
            target: cmd.target,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            position_type: cmd.position_type,
            user_id: cmd.user_id,
            store_id: cmd.store_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateGoal) -> Result<Vec<SalesGoalEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_goal_id(cmd.goal_id)?;

        if !self.is_active {
            return Err(DomainError::invariant("goal is already inactive"));
        }

        Ok(vec![SalesGoalEvent::GoalDeactivated(GoalDeactivated {
            tenant_id: cmd.tenant_id,
            goal_id: cmd.goal_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
pub(crate) fn set_goal_cmd(
    tenant_id: TenantId,
    goal_id: SalesGoalId,
    target: GoalTarget,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> SetGoal {
    SetGoal {
        tenant_id,
        goal_id,
        name: "October upsells".to_string(),
        target,
        start_date,
        end_date,
        position_type: None,
        user_id: None,
        store_id: None,
        occurred_at: Utc::now(),
    }
}
