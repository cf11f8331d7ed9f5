use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use glowdesk_core::{StoreId, TenantId, UserId};
use glowdesk_events::EventEnvelope;
use glowdesk_goals::{GoalCriteria, GoalTarget, PositionType, SalesGoalEvent, SalesGoalId};

use crate::event_store::aggregate_types::SALES_GOAL;
use crate::projections::Projection;
use crate::projections::cursor::{ProjectionError, StreamCursors, check_scope, decode};
use crate::read_model::TenantStore;
use crate::realtime::ChangeFeed;

pub const TABLE: &str = "sales_goals";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesGoalReadModel {
    pub goal_id: SalesGoalId,
    pub name: String,
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub position_type: Option<PositionType>,
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl SalesGoalReadModel {
    pub fn criteria(&self) -> GoalCriteria {
        GoalCriteria {
            target: self.target,
            start_date: self.start_date,
            end_date: self.end_date,
            position_type: self.position_type,
            user_id: self.user_id,
            store_id: self.store_id,
        }
    }
}

#[derive(Debug)]
pub struct SalesGoalsProjection<S>
where
    S: TenantStore<SalesGoalId, SalesGoalReadModel>,
{
    store: S,
    cursors: StreamCursors,
    feed: Option<ChangeFeed>,
}

impl<S> SalesGoalsProjection<S>
where
    S: TenantStore<SalesGoalId, SalesGoalReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
            feed: None,
        }
    }

    pub fn with_change_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn get(&self, tenant_id: TenantId, goal_id: &SalesGoalId) -> Option<SalesGoalReadModel> {
        self.store.get(tenant_id, goal_id)
    }

    /// Goals ordered by end date, soonest first.
    pub fn list(&self, tenant_id: TenantId, active_only: bool) -> Vec<SalesGoalReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|g| !active_only || g.is_active)
            .collect();
        rows.sort_by(|a, b| a.end_date.cmp(&b.end_date).then(a.goal_id.cmp(&b.goal_id)));
        rows
    }

    fn write(&self, tenant_id: TenantId, row: SalesGoalReadModel) {
        let existed = self.store.upsert(tenant_id, row.goal_id, row.clone()).is_some();
        if let Some(feed) = &self.feed {
            feed.emit_row(tenant_id, TABLE, existed, &row);
        }
    }
}

impl<S> Projection for SalesGoalsProjection<S>
where
    S: TenantStore<SalesGoalId, SalesGoalReadModel>,
{
    fn name(&self) -> &'static str {
        TABLE
    }

    fn aggregate_type(&self) -> &'static str {
        SALES_GOAL
    }

    fn project(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();

        self.cursors.advance(envelope, || {
            match decode::<SalesGoalEvent>(envelope)? {
                SalesGoalEvent::GoalSet(e) => {
                    check_scope(envelope, e.tenant_id, e.goal_id.0)?;
                    self.write(
                        tenant_id,
                        SalesGoalReadModel {
                            goal_id: e.goal_id,
                            name: e.name,
                            target: e.target,
                            start_date: e.start_date,
                            end_date: e.end_date,
                            position_type: e.position_type,
                            user_id: e.user_id,
                            store_id: e.store_id,
                            is_active: true,
                            updated_at: e.occurred_at,
                        },
                    );
                }
                SalesGoalEvent::GoalDeactivated(e) => {
                    check_scope(envelope, e.tenant_id, e.goal_id.0)?;
                    match self.store.get(tenant_id, &e.goal_id) {
                        Some(mut row) => {
                            row.is_active = false;
                            row.updated_at = e.occurred_at;
                            self.write(tenant_id, row);
                        }
                        None => warn!(%tenant_id, goal_id = %e.goal_id, "deactivation for a goal the projection has not seen"),
                    }
                }
            }
            Ok(())
        })?;

        Ok(())
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.cursors.clear_tenant(tenant_id);
        self.store.clear_tenant(tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use uuid::Uuid;

    use glowdesk_core::AggregateId;
    use glowdesk_goals::{GoalDeactivated, GoalSet};

    use crate::read_model::InMemoryTenantStore;

    fn envelope(tenant: TenantId, goal: SalesGoalId, seq: u64, event: SalesGoalEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), tenant, goal.0, SALES_GOAL, seq, serde_json::to_value(event).unwrap())
    }

    fn goal_set(tenant: TenantId, goal: SalesGoalId, end_day: u32) -> SalesGoalEvent {
        SalesGoalEvent::GoalSet(GoalSet {
            tenant_id: tenant,
            goal_id: goal,
            name: "October upsells".to_string(),
            target: GoalTarget::Amount(Decimal::new(5_000, 0)),
            start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 10, end_day).unwrap(),
            position_type: Some(PositionType::Upseller),
            user_id: None,
            store_id: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn deactivated_goals_drop_out_of_the_active_list() {
        let projection = SalesGoalsProjection::new(Arc::new(InMemoryTenantStore::new()));
        let tenant = TenantId::new();
        let kept = SalesGoalId::new(AggregateId::new());
        let retired = SalesGoalId::new(AggregateId::new());

        projection.apply_envelope(&envelope(tenant, kept, 1, goal_set(tenant, kept, 31))).unwrap();
        projection.apply_envelope(&envelope(tenant, retired, 1, goal_set(tenant, retired, 15))).unwrap();
        let off = SalesGoalEvent::GoalDeactivated(GoalDeactivated {
            tenant_id: tenant,
            goal_id: retired,
            occurred_at: Utc::now(),
        });
        projection.apply_envelope(&envelope(tenant, retired, 2, off)).unwrap();

        let active: Vec<_> = projection.list(tenant, true).into_iter().map(|g| g.goal_id).collect();
        assert_eq!(active, vec![kept]);
        let all: Vec<_> = projection.list(tenant, false).into_iter().map(|g| g.goal_id).collect();
        assert_eq!(all, vec![retired, kept]);
    }

    #[test]
    fn criteria_carries_the_goal_filter() {
        let projection = SalesGoalsProjection::new(Arc::new(InMemoryTenantStore::new()));
        let tenant = TenantId::new();
        let goal = SalesGoalId::new(AggregateId::new());

        projection.apply_envelope(&envelope(tenant, goal, 1, goal_set(tenant, goal, 31))).unwrap();

        let criteria = projection.get(tenant, &goal).unwrap().criteria();
        assert_eq!(criteria.position_type, Some(PositionType::Upseller));
        assert_eq!(criteria.target, GoalTarget::Amount(Decimal::new(5_000, 0)));
    }
}
