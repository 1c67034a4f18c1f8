use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use campaign_config::PacingConfig;
use campaign_domain::RunPhase;

/// Uniform jitter between attempts, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterPacer {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl JitterPacer {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms: max_delay_ms.max(min_delay_ms),
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.min_delay_ms == self.max_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        let millis = rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

impl From<&PacingConfig> for JitterPacer {
    fn from(config: &PacingConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }
}

/// Sleeps for `delay` unless the published phase leaves `Running` first.
/// Returns `true` when the full delay elapsed.
pub async fn interruptible_sleep(delay: Duration, control_rx: &mut watch::Receiver<RunPhase>) -> bool {
    if *control_rx.borrow_and_update() != RunPhase::Running {
        return false;
    }
    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return true,
            changed = control_rx.changed() => {
                if changed.is_err() || *control_rx.borrow_and_update() != RunPhase::Running {
                    return false;
                }
            }
        }
    }
}
