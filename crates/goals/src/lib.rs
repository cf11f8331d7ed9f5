//! Sales goals and progress tracking.

pub mod goal;
pub mod progress;

pub use goal::{
    DeactivateGoal, GoalDeactivated, GoalSet, GoalTarget, PositionType, SalesGoal,
    SalesGoalCommand, SalesGoalEvent, SalesGoalId, SetGoal,
};
pub use progress::{GoalCriteria, GoalProgress, daily_needed, days_remaining, progress_percentage};
