use serde::{Deserialize, Serialize};
use tracing::debug;

use campaign_domain::RunPhase;

/// Operator commands accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    Start,
    Resume,
    Pause,
    Cancel,
}

impl ControlAction {
    /// Phase reached when `self` is applied in `phase`, or `None` when the
    /// command is a no-op there.
    pub fn target(self, phase: RunPhase) -> Option<RunPhase> {
        use ControlAction::*;
        use RunPhase::*;

        let target = match (self, phase) {
            (Start, Idle | Paused) => Some(Running),
            (Resume, Paused) => Some(Running),
            (Pause, Running) => Some(Paused),
            (Cancel, Running | Paused) => Some(Cancelled),
            _ => None,
        };

        if target.is_none() {
            debug!("当前阶段 {} 不允许执行 {:?} 操作，忽略", phase, self);
        }

        target
    }

    pub fn can_perform(self, phase: RunPhase) -> bool {
        self.target(phase).is_some()
    }
}
