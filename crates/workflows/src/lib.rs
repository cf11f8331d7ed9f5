//! Low-stock reorder workflows.
//!
//! ## Components
//!
//! - `WorkflowRule`: trigger conditions plus the actions to run
//! - `select_rule`: which active rule handles a low or empty item
//! - `EpisodePhase`: fire once per low-stock episode, escalate once at zero
//! - `WorkflowExecution`: `pending → processing → completed | failed`
//! - `ActionRegistry`: runs every action of a rule, recording each outcome
//!
//! Action side effects (notifications, emails, purchase requests) are
//! registered by the host; this crate performs no IO.

pub mod engine;
pub mod episode;
pub mod execution;
pub mod rule;

pub use engine::{ActionContext, ActionError, ActionHandler, ActionRegistry};
pub use episode::{EpisodePhase, EpisodeTransition};
pub use execution::{ActionOutcome, ExecutionId, ExecutionStatus, WorkflowError, WorkflowExecution};
pub use rule::{
    StockSnapshot, TriggerConditions, WorkflowAction, WorkflowRule, WorkflowRuleId, WorkflowType,
    select_rule,
};
