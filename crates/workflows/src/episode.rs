//! Low-stock episodes.
//!
//! An episode starts when an item first drops to or below its threshold and
//! ends when it is back in stock. Within one episode the item triggers a
//! workflow once, plus one escalation the first time it reaches zero.

use serde::{Deserialize, Serialize};

use glowdesk_inventory::StockStatus;

use crate::rule::WorkflowType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodePhase {
    /// Triggered for low stock; not yet escalated.
    Low,
    /// Reached zero and escalated. Stays here until resolved.
    Escalated,
}

/// Result of feeding a new stock status into an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeTransition {
    /// Workflow to run now, if any.
    pub fire: Option<WorkflowType>,
    /// Episode phase afterwards; `None` means resolved (or never started).
    pub next: Option<EpisodePhase>,
}

impl EpisodePhase {
    pub fn advance(current: Option<EpisodePhase>, status: StockStatus) -> EpisodeTransition {
        use EpisodePhase::*;

        match (current, status) {
            (_, StockStatus::InStock) => EpisodeTransition { fire: None, next: None },

            (None, StockStatus::LowStock) => EpisodeTransition {
                fire: Some(WorkflowType::StockAlert),
                next: Some(Low),
            },
            (Some(phase), StockStatus::LowStock) => EpisodeTransition {
                fire: None,
                next: Some(phase),
            },

            (None | Some(Low), StockStatus::OutOfStock) => EpisodeTransition {
                fire: Some(WorkflowType::EmergencyRestock),
                next: Some(Escalated),
            },
            (Some(Escalated), StockStatus::OutOfStock) => EpisodeTransition {
                fire: None,
                next: Some(Escalated),
            },
        }
    }
}
