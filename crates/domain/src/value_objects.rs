use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Recipient;

/// Dispatch engine state. `Cancelled` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Cancelled | RunPhase::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Paused => "paused",
            RunPhase::Cancelled => "cancelled",
            RunPhase::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the gateway said about one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    Accepted,
    Rejected { reason: String },
}

/// Classification of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { reason: String },
}

impl Outcome {
    pub fn failure<S: Into<String>>(reason: S) -> Self {
        Outcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// `round(done * 100 / total)` with halves rounded up; an empty run is 100%.
pub fn progress_percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    let total = total as u128;
    ((done * 200 + total) / (total * 2)) as u8
}

/// Read-only view of a run handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub total: usize,
    pub cursor: usize,
    pub sent_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    pub in_flight: usize,
    pub current_target: Option<Recipient>,
    pub progress_percentage: u8,
    pub updated_at: DateTime<Utc>,
}

impl RunSnapshot {
    pub fn attempted(&self) -> usize {
        self.sent_count + self.failed_count
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Failures outnumber a third of the successes.
    pub fn is_degraded(&self) -> bool {
        self.failed_count * 3 > self.sent_count
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            run_id: self.run_id,
            phase: self.phase,
            sent_count: self.sent_count,
            failed_count: self.failed_count,
            total: self.total,
        }
    }
}

/// Final tally of a run. Also produced for a cancelled run, carrying the partial counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub sent_count: usize,
    pub failed_count: usize,
    pub total: usize,
}

impl CampaignSummary {
    pub fn attempted(&self) -> usize {
        self.sent_count + self.failed_count
    }

    pub fn not_attempted(&self) -> usize {
        self.total.saturating_sub(self.attempted())
    }
}
