//! Workflow rules, executions and low-stock episodes per business.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use thiserror::Error;

use glowdesk_core::{Entity, TenantId};
use glowdesk_inventory::InventoryItemId;
use glowdesk_workflows::{EpisodePhase, WorkflowExecution, WorkflowRule, WorkflowRuleId};

use crate::realtime::ChangeFeed;

pub const RULES_TABLE: &str = "workflow_rules";
pub const EXECUTIONS_TABLE: &str = "workflow_executions";

/// Executions kept per business; older ones are dropped first.
pub const EXECUTION_RETENTION: usize = 1_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowStoreError {
    #[error("workflow rule {0} not found")]
    RuleNotFound(WorkflowRuleId),

    #[error("workflow store lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
pub struct WorkflowStore {
    rules: RwLock<HashMap<TenantId, Vec<WorkflowRule>>>,
    executions: RwLock<HashMap<TenantId, VecDeque<WorkflowExecution>>>,
    episodes: Mutex<HashMap<(TenantId, InventoryItemId), EpisodePhase>>,
    feed: Option<ChangeFeed>,
    retention: usize,
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self {
            rules: RwLock::default(),
            executions: RwLock::default(),
            episodes: Mutex::default(),
            feed: None,
            retention: EXECUTION_RETENTION,
        }
    }
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retention` executions per business (at least one).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn with_change_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn add_rule(&self, tenant_id: TenantId, rule: WorkflowRule) -> Result<WorkflowRule, WorkflowStoreError> {
        let mut rules = self.rules.write().map_err(|_| WorkflowStoreError::Poisoned)?;
        rules.entry(tenant_id).or_default().push(rule.clone());
        self.announce(tenant_id, RULES_TABLE, false, &rule);
        Ok(rule)
    }

    /// Rules of a business, oldest first.
    pub fn rules(&self, tenant_id: TenantId) -> Result<Vec<WorkflowRule>, WorkflowStoreError> {
        let rules = self.rules.read().map_err(|_| WorkflowStoreError::Poisoned)?;
        let mut out = rules.get(&tenant_id).cloned().unwrap_or_default();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.rule_id.cmp(&b.rule_id)));
        Ok(out)
    }

    pub fn set_active(
        &self,
        tenant_id: TenantId,
        rule_id: WorkflowRuleId,
        is_active: bool,
    ) -> Result<WorkflowRule, WorkflowStoreError> {
        let mut rules = self.rules.write().map_err(|_| WorkflowStoreError::Poisoned)?;
        let rule = rules
            .get_mut(&tenant_id)
            .and_then(|r| r.iter_mut().find(|r| r.id() == rule_id))
            .ok_or(WorkflowStoreError::RuleNotFound(rule_id))?;
        rule.is_active = is_active;
        let updated = rule.clone();
        self.announce(tenant_id, RULES_TABLE, true, &updated);
        Ok(updated)
    }

    /// Store a finished execution and bump its rule's execution count.
    ///
    /// Both happen under the rules write lock, so concurrent runs of the
    /// same rule never lose an increment.
    pub fn record_execution(
        &self,
        tenant_id: TenantId,
        execution: WorkflowExecution,
    ) -> Result<(), WorkflowStoreError> {
        let mut rules = self.rules.write().map_err(|_| WorkflowStoreError::Poisoned)?;
        let rule = rules
            .get_mut(&tenant_id)
            .and_then(|r| r.iter_mut().find(|r| r.id() == execution.rule_id))
            .ok_or(WorkflowStoreError::RuleNotFound(execution.rule_id))?;
        rule.execution_count += 1;
        let rule = rule.clone();

        let mut executions = self.executions.write().map_err(|_| WorkflowStoreError::Poisoned)?;
        self.announce(tenant_id, EXECUTIONS_TABLE, false, &execution);
        let rows = executions.entry(tenant_id).or_default();
        rows.push_back(execution);
        while rows.len() > self.retention {
            rows.pop_front();
        }
        drop(executions);

        self.announce(tenant_id, RULES_TABLE, true, &rule);
        Ok(())
    }

    /// Executions of a business, newest first.
    pub fn executions(&self, tenant_id: TenantId, limit: Option<usize>) -> Result<Vec<WorkflowExecution>, WorkflowStoreError> {
        let executions = self.executions.read().map_err(|_| WorkflowStoreError::Poisoned)?;
        Ok(executions
            .get(&tenant_id)
            .map(|rows| {
                rows.iter()
                    .rev()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Run `step` against the item's current episode and store the phase it returns.
    ///
    /// The episode map stays locked for the whole step, so two updates of the
    /// same item cannot both start an episode.
    pub fn with_episode<R>(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        step: impl FnOnce(Option<EpisodePhase>) -> (Option<EpisodePhase>, R),
    ) -> Result<R, WorkflowStoreError> {
        let mut episodes = self.episodes.lock().map_err(|_| WorkflowStoreError::Poisoned)?;
        let key = (tenant_id, item_id);
        let (next, out) = step(episodes.get(&key).copied());
        match next {
            Some(phase) => episodes.insert(key, phase),
            None => episodes.remove(&key),
        };
        Ok(out)
    }

    pub fn episode(&self, tenant_id: TenantId, item_id: InventoryItemId) -> Result<Option<EpisodePhase>, WorkflowStoreError> {
        let episodes = self.episodes.lock().map_err(|_| WorkflowStoreError::Poisoned)?;
        Ok(episodes.get(&(tenant_id, item_id)).copied())
    }

    fn announce<T: serde::Serialize>(&self, tenant_id: TenantId, table: &str, existed: bool, row: &T) {
        if let Some(feed) = &self.feed {
            feed.emit_row(tenant_id, table, existed, row);
        }
    }
}
