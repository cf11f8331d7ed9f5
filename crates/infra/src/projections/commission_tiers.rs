use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use glowdesk_commissions::{CommissionTier, RoleType, TierScheduleEvent, TierScope, effective_tiers};
use glowdesk_core::{TenantId, UserId};
use glowdesk_events::{ChangeKind, EventEnvelope};

use crate::event_store::aggregate_types::TIER_SCHEDULE;
use crate::projections::Projection;
use crate::projections::cursor::{ProjectionError, StreamCursors, check_scope, decode};
use crate::read_model::TenantStore;
use crate::realtime::ChangeFeed;

pub const TABLE: &str = "commission_tiers";

/// The current tier schedule of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierScheduleReadModel {
    pub scope: TierScope,
    pub tiers: Vec<CommissionTier>,
    pub updated_at: DateTime<Utc>,
}

/// Commission tier schedules per role and per employee.
///
/// A replaced schedule is swapped in one write, so readers never see a
/// half-replaced schedule. A cleared schedule is removed.
#[derive(Debug)]
pub struct CommissionTiersProjection<S>
where
    S: TenantStore<TierScope, TierScheduleReadModel>,
{
    store: S,
    cursors: StreamCursors,
    feed: Option<ChangeFeed>,
}

impl<S> CommissionTiersProjection<S>
where
    S: TenantStore<TierScope, TierScheduleReadModel>,
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

    pub fn list(&self, tenant_id: TenantId) -> Vec<TierScheduleReadModel> {
        let mut rows = self.store.list(tenant_id);
        rows.sort_by_key(|r| r.scope.key());
        rows
    }

    /// Tiers of one scope; empty when none are configured.
    pub fn tiers_for(&self, tenant_id: TenantId, scope: &TierScope) -> Vec<CommissionTier> {
        self.store
            .get(tenant_id, scope)
            .map(|s| s.tiers)
            .unwrap_or_default()
    }

    /// Tiers that apply to `user_id`: their own schedule when one exists,
    /// otherwise the schedule of `role`.
    pub fn effective_for(&self, tenant_id: TenantId, user_id: UserId, role: Option<&RoleType>) -> Vec<CommissionTier> {
        let employee = self.tiers_for(tenant_id, &TierScope::Employee(user_id));
        let role_tiers = role
            .map(|r| self.tiers_for(tenant_id, &TierScope::Role(r.clone())))
            .unwrap_or_default();
        effective_tiers(&employee, &role_tiers).to_vec()
    }
}

impl<S> Projection for CommissionTiersProjection<S>
where
    S: TenantStore<TierScope, TierScheduleReadModel>,
{
    fn name(&self) -> &'static str {
        TABLE
    }

    fn aggregate_type(&self) -> &'static str {
        TIER_SCHEDULE
    }

    fn project(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();

        self.cursors.advance(envelope, || {
            let event: TierScheduleEvent = decode(envelope)?;
            let scope_id = event.scope().aggregate_id(tenant_id);

            match event {
                TierScheduleEvent::TiersReplaced(e) => {
                    check_scope(envelope, e.tenant_id, scope_id)?;
                    let row = TierScheduleReadModel {
                        scope: e.scope.clone(),
                        tiers: e.tiers,
                        updated_at: e.occurred_at,
                    };
                    let existed = self.store.upsert(tenant_id, e.scope, row.clone()).is_some();
                    if let Some(feed) = &self.feed {
                        feed.emit_row(tenant_id, TABLE, existed, &row);
                    }
                }
                TierScheduleEvent::TiersCleared(e) => {
                    check_scope(envelope, e.tenant_id, scope_id)?;
                    if let Some(removed) = self.store.remove(tenant_id, &e.scope) {
                        if let Some(feed) = &self.feed {
                            feed.emit_kind(tenant_id, TABLE, ChangeKind::Delete, &removed);
                        }
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
