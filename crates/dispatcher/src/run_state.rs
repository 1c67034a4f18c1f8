use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use campaign_domain::{
    progress_percentage, CampaignSummary, Outcome, Recipient, RecipientQueue, RunPhase,
    RunSnapshot,
};

use crate::controller::ControlAction;

/// Mutable record of one run. Owned by the engine; observers only see
/// [`RunSnapshot`]s.
///
/// `pending` and the cursor are derived from the recorded counts, so
/// `sent + failed + pending == total` and `cursor == sent + failed` hold for
/// every state this type can reach.
#[derive(Debug)]
pub struct RunState {
    run_id: Uuid,
    queue: RecipientQueue,
    phase: RunPhase,
    next_index: usize,
    sent_count: usize,
    failed_count: usize,
    in_flight: BTreeMap<usize, Recipient>,
    outcomes: Vec<Option<Outcome>>,
    active_workers: usize,
    cancel_reported: bool,
    updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(queue: RecipientQueue) -> Self {
        let total = queue.len();
        Self {
            run_id: Uuid::new_v4(),
            queue,
            phase: RunPhase::Idle,
            next_index: 0,
            sent_count: 0,
            failed_count: 0,
            in_flight: BTreeMap::new(),
            outcomes: vec![None; total],
            active_workers: 0,
            cancel_reported: false,
            updated_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn total(&self) -> usize {
        self.queue.len()
    }

    pub fn cursor(&self) -> usize {
        self.sent_count + self.failed_count
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn pending_count(&self) -> usize {
        self.total() - self.cursor()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers
    }

    /// Lowest-index attempt in flight, only reported while running.
    pub fn current_target(&self) -> Option<&Recipient> {
        if self.phase != RunPhase::Running {
            return None;
        }
        self.in_flight.values().next()
    }

    pub fn outcomes(&self) -> &[Option<Outcome>] {
        &self.outcomes
    }

    pub fn has_unclaimed(&self) -> bool {
        self.next_index < self.total()
    }

    /// Applies an operator command. Returns the new phase, or `None` for a no-op.
    ///
    /// Starting with nothing left to record goes straight to `Completed`.
    pub fn apply(&mut self, action: ControlAction) -> Option<RunPhase> {
        let target = action.target(self.phase)?;
        self.phase = target;
        self.complete_if_exhausted();
        self.touch();
        Some(self.phase)
    }

    /// Claims the next recipient for a worker. `None` once the run is not
    /// running or every recipient has been handed out.
    pub fn claim_next(&mut self) -> Option<(usize, Recipient)> {
        if self.phase != RunPhase::Running || !self.has_unclaimed() {
            return None;
        }
        let index = self.next_index;
        let recipient = self.queue.get(index)?.clone();
        self.next_index += 1;
        self.in_flight.insert(index, recipient.clone());
        self.touch();
        Some((index, recipient))
    }

    /// Records the outcome of a claimed attempt. Returns `true` when this
    /// record completed the run.
    pub fn record(&mut self, index: usize, outcome: Outcome) -> bool {
        if self.in_flight.remove(&index).is_none() {
            return false;
        }
        if outcome.is_success() {
            self.sent_count += 1;
        } else {
            self.failed_count += 1;
        }
        if let Some(slot) = self.outcomes.get_mut(index) {
            *slot = Some(outcome);
        }
        self.touch();
        self.complete_if_exhausted()
    }

    pub fn worker_started(&mut self) {
        self.active_workers += 1;
    }

    /// Returns `true` when the last worker of a cancelled run just left, which
    /// is when the cancellation is reported.
    pub fn worker_exited(&mut self) -> bool {
        self.active_workers = self.active_workers.saturating_sub(1);
        self.take_cancel_report()
    }

    /// Cancellation is reported once, after in-flight attempts have drained.
    pub fn take_cancel_report(&mut self) -> bool {
        if self.phase == RunPhase::Cancelled && self.active_workers == 0 && !self.cancel_reported {
            self.cancel_reported = true;
            return true;
        }
        false
    }

    pub fn is_settled(&self) -> bool {
        self.active_workers == 0 && self.phase != RunPhase::Running
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id,
            phase: self.phase,
            total: self.total(),
            cursor: self.cursor(),
            sent_count: self.sent_count,
            failed_count: self.failed_count,
            pending_count: self.pending_count(),
            in_flight: self.in_flight.len(),
            current_target: self.current_target().cloned(),
            progress_percentage: progress_percentage(self.cursor(), self.total()),
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            run_id: self.run_id,
            phase: self.phase,
            sent_count: self.sent_count,
            failed_count: self.failed_count,
            total: self.total(),
        }
    }

    fn complete_if_exhausted(&mut self) -> bool {
        if self.phase == RunPhase::Running && self.cursor() == self.total() {
            self.phase = RunPhase::Completed;
            return true;
        }
        false
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
