//! Workflow execution records and their state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use glowdesk_core::{AggregateId, TenantId};
use glowdesk_inventory::InventoryItemId;

use crate::rule::{WorkflowAction, WorkflowRuleId, WorkflowType};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub AggregateId);

impl ExecutionId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (*self, next),
            (Pending, Processing) | (Processing, Completed) | (Processing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Processing => "processing",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("illegal execution transition {from} -> {to}")]
    IllegalTransition { from: &'static str, to: &'static str },
}

/// What happened when one action ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: WorkflowAction,
    pub success: bool,
    pub detail: String,
}

/// One run of a rule against one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub execution_id: ExecutionId,
    pub tenant_id: TenantId,
    pub rule_id: WorkflowRuleId,
    pub workflow_type: WorkflowType,
    pub item_id: InventoryItemId,
    pub status: ExecutionStatus,
    pub outcomes: Vec<ActionOutcome>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    pub fn pending(
        tenant_id: TenantId,
        rule_id: WorkflowRuleId,
        workflow_type: WorkflowType,
        item_id: InventoryItemId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id: ExecutionId::new(),
            tenant_id,
            rule_id,
            workflow_type,
            item_id,
            status: ExecutionStatus::Pending,
            outcomes: Vec::new(),
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    fn transition(&mut self, next: ExecutionStatus) -> Result<(), WorkflowError> {
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::IllegalTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_processing(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.transition(ExecutionStatus::Processing)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Record outcomes and settle: `failed` if any action failed.
    pub fn finish(
        &mut self,
        outcomes: Vec<ActionOutcome>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let next = if outcomes.iter().all(|o| o.success) {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        self.transition(next)?;
        self.outcomes = outcomes;
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn failed_actions(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution() -> WorkflowExecution {
        WorkflowExecution::pending(
            TenantId::new(),
            WorkflowRuleId::new(),
            WorkflowType::StockAlert,
            InventoryItemId::new(AggregateId::new()),
            Utc::now(),
        )
    }

    fn outcome(action: WorkflowAction, success: bool) -> ActionOutcome {
        ActionOutcome {
            action,
            success,
            detail: String::new(),
        }
    }

    #[test]
    fn happy_path_completes() {
        let mut exec = execution();
        exec.mark_processing(Utc::now()).unwrap();
        exec.finish(vec![outcome(WorkflowAction::SendNotification, true)], Utc::now())
            .unwrap();
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert!(exec.status.is_terminal());
        assert!(exec.finished_at.is_some());
    }

    #[test]
    fn any_failed_action_fails_the_execution() {
        let mut exec = execution();
        exec.mark_processing(Utc::now()).unwrap();
        exec.finish(
            vec![
                outcome(WorkflowAction::SendNotification, true),
                outcome(WorkflowAction::EmailManager, false),
            ],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert_eq!(exec.failed_actions().count(), 1);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut exec = execution();
        let err = exec.finish(vec![], Utc::now()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::IllegalTransition {
                from: "pending",
                to: "completed"
            }
        );

        exec.mark_processing(Utc::now()).unwrap();
        assert!(exec.mark_processing(Utc::now()).is_err());

        exec.finish(vec![], Utc::now()).unwrap();
        assert!(exec.finish(vec![], Utc::now()).is_err());
        assert_eq!(exec.status, ExecutionStatus::Completed);
    }
}
