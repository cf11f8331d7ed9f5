//! Action dispatch with per-action isolation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::execution::{ActionOutcome, ExecutionId, WorkflowError, WorkflowExecution};
use crate::rule::{StockSnapshot, WorkflowAction, WorkflowRule, WorkflowType};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("no handler registered for action '{0}'")]
    NoHandler(&'static str),

    #[error("action failed: {0}")]
    Failed(String),
}

impl ActionError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Everything an action handler gets to see.
#[derive(Debug, Clone)]
pub struct ActionContext<'a> {
    pub execution_id: ExecutionId,
    pub rule: &'a WorkflowRule,
    pub workflow_type: WorkflowType,
    pub snapshot: &'a StockSnapshot,
    pub now: DateTime<Utc>,
}

/// Handler for one action kind. Returns a short description of what it did.
pub type ActionHandler = Box<dyn Fn(&ActionContext<'_>) -> Result<String, ActionError> + Send + Sync>;

/// Maps each `WorkflowAction` to its handler.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<WorkflowAction, ActionHandler>,
}

impl core::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut actions: Vec<_> = self.handlers.keys().map(|a| a.as_str()).collect();
        actions.sort_unstable();
        f.debug_struct("ActionRegistry").field("actions", &actions).finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&mut self, action: WorkflowAction, handler: F)
    where
        F: Fn(&ActionContext<'_>) -> Result<String, ActionError> + Send + Sync + 'static,
    {
        self.handlers.insert(action, Box::new(handler));
    }

    pub fn has_handler(&self, action: WorkflowAction) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Run every action of `rule` in order.
    ///
    /// A failing (or missing) handler is recorded and the remaining actions
    /// still run. The returned execution is `completed` or `failed`.
    pub fn run(
        &self,
        rule: &WorkflowRule,
        workflow_type: WorkflowType,
        snapshot: &StockSnapshot,
        now: DateTime<Utc>,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let mut execution = WorkflowExecution::pending(
            snapshot.tenant_id,
            rule.rule_id,
            workflow_type,
            snapshot.item_id,
            now,
        );
        execution.mark_processing(now)?;

        let ctx = ActionContext {
            execution_id: execution.execution_id,
            rule,
            workflow_type,
            snapshot,
            now,
        };

        let outcomes = rule
            .actions
            .iter()
            .map(|&action| {
                let result = match self.handlers.get(&action) {
                    Some(handler) => handler(&ctx),
                    None => Err(ActionError::NoHandler(action.as_str())),
                };
                match result {
                    Ok(detail) => ActionOutcome {
                        action,
                        success: true,
                        detail,
                    },
                    Err(e) => ActionOutcome {
                        action,
                        success: false,
                        detail: e.to_string(),
                    },
                }
            })
            .collect();

        execution.finish(outcomes, Utc::now().max(now))?;
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionStatus;
    use crate::rule::{TriggerConditions, snapshot};
    use std::sync::{Arc, Mutex};

    fn rule_with(actions: Vec<WorkflowAction>) -> WorkflowRule {
        WorkflowRule::new(
            "Reorder toner",
            WorkflowType::StockAlert,
            TriggerConditions::default(),
            actions,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn all_actions_run_even_when_one_fails() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionRegistry::new();

        let log = ran.clone();
        registry.register_handler(WorkflowAction::SendNotification, move |_| {
            log.lock().unwrap().push("notify");
            Ok("notified".to_string())
        });
        registry.register_handler(WorkflowAction::EmailManager, |_| {
            Err(ActionError::failed("smtp relay unavailable"))
        });
        let log = ran.clone();
        registry.register_handler(WorkflowAction::CreatePurchaseOrder, move |ctx| {
            log.lock().unwrap().push("po");
            Ok(format!("reorder for {}", ctx.snapshot.name))
        });

        let rule = rule_with(vec![
            WorkflowAction::SendNotification,
            WorkflowAction::EmailManager,
            WorkflowAction::CreatePurchaseOrder,
        ]);
        let exec = registry
            .run(&rule, WorkflowType::StockAlert, &snapshot(2, 5), Utc::now())
            .unwrap();

        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert_eq!(exec.outcomes.len(), 3);
        assert!(!exec.outcomes[1].success);
        assert!(exec.outcomes[1].detail.contains("smtp"));
        assert_eq!(*ran.lock().unwrap(), vec!["notify", "po"]);
    }

    #[test]
    fn missing_handler_is_a_failed_outcome() {
        let registry = ActionRegistry::new();
        let rule = rule_with(vec![WorkflowAction::NotifyManager]);
        let exec = registry
            .run(&rule, WorkflowType::StockAlert, &snapshot(2, 5), Utc::now())
            .unwrap();
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert_eq!(
            exec.outcomes[0].detail,
            "no handler registered for action 'notify_manager'"
        );
    }

    #[test]
    fn successful_run_completes() {
        let mut registry = ActionRegistry::new();
        registry.register_handler(WorkflowAction::SendNotification, |_| Ok("ok".to_string()));
        let rule = rule_with(vec![WorkflowAction::SendNotification]);
        let exec = registry
            .run(&rule, WorkflowType::StockAlert, &snapshot(0, 5), Utc::now())
            .unwrap();
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert!(exec.started_at.is_some());
    }
}
