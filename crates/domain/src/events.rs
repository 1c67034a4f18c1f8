//! Notifications emitted by the dispatch engine.

use serde::{Deserialize, Serialize};

use crate::entities::Recipient;
use crate::value_objects::{CampaignSummary, Outcome, RunSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// Full state after any mutation.
    StateChanged(RunSnapshot),
    AttemptRecorded {
        index: usize,
        recipient: Recipient,
        outcome: Outcome,
    },
    /// Emitted once, when the queue is exhausted.
    Completed(CampaignSummary),
    Cancelled(CampaignSummary),
}

impl DispatchEvent {
    pub fn snapshot(&self) -> Option<&RunSnapshot> {
        match self {
            DispatchEvent::StateChanged(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
