//! Helpers for observing a running engine from tests.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::timeout;

use campaign_domain::{DispatchEvent, RunSnapshot};

/// Generous bound; tests run on paused time, so this only trips on a hang.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(600);

/// Waits until the latest snapshot satisfies `predicate`.
pub async fn wait_for_snapshot<F>(rx: &mut watch::Receiver<RunSnapshot>, predicate: F) -> RunSnapshot
where
    F: FnMut(&RunSnapshot) -> bool,
{
    let snapshot = timeout(DEFAULT_WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("engine dropped its snapshot channel");
    snapshot.clone()
}

/// Collects events until the run reports `Completed` or `Cancelled`
/// (inclusive). Panics if the receiver lagged.
pub async fn collect_until_terminal(rx: &mut broadcast::Receiver<DispatchEvent>) -> Vec<DispatchEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(DEFAULT_WAIT, rx.recv())
            .await
            .expect("timed out waiting for terminal event")
            .expect("event receiver lagged or closed");
        let terminal = matches!(
            event,
            DispatchEvent::Completed(_) | DispatchEvent::Cancelled(_)
        );
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Counter invariants every snapshot must satisfy.
pub fn assert_snapshot_invariants(snapshot: &RunSnapshot) {
    assert_eq!(
        snapshot.sent_count + snapshot.failed_count + snapshot.pending_count,
        snapshot.total,
        "sent + failed + pending must equal total: {:?}",
        snapshot
    );
    assert_eq!(
        snapshot.cursor,
        snapshot.sent_count + snapshot.failed_count,
        "cursor must equal sent + failed: {:?}",
        snapshot
    );
    assert!(snapshot.progress_percentage <= 100);
    if snapshot.current_target.is_some() {
        assert_eq!(snapshot.phase, campaign_domain::RunPhase::Running);
    }
}
