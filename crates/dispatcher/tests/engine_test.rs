use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Semaphore};
use tokio::time::{timeout, Instant};

use campaign_config::{DispatchConfig, PacingConfig};
use campaign_dispatcher::{DispatchEngine, DispatchEvent, Outcome, RunPhase};
use campaign_domain::{Attachment, CampaignError, Message, RecipientQueue, SendCapability};
use campaign_testing_utils::{
    assert_snapshot_invariants, collect_until_terminal, queue_of, wait_for_snapshot,
    PanickingSender, RecipientQueueBuilder, ScriptedReply, ScriptedSender,
};

fn message(body: &str) -> Message {
    Message::compose(body, None).unwrap()
}

fn engine_with(
    queue: RecipientQueue,
    sender: Arc<dyn SendCapability>,
    pacing: PacingConfig,
) -> DispatchEngine {
    DispatchEngine::builder()
        .queue(queue)
        .message(message("Olá {nome}, temos novidades!"))
        .sender(sender)
        .pacing(pacing)
        .build()
        .unwrap()
}

fn scripted_engine(addresses: &[&str], sender: &ScriptedSender, delay_ms: u64) -> DispatchEngine {
    engine_with(
        queue_of(addresses),
        Arc::new(sender.clone()),
        PacingConfig::fixed(delay_ms),
    )
}

fn recorded_indices(events: &[DispatchEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            DispatchEvent::AttemptRecorded { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}

/// Drains whatever is buffered and counts `Completed` notifications.
fn drain_completed(rx: &mut broadcast::Receiver<DispatchEvent>) -> usize {
    let mut completed = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, DispatchEvent::Completed(_)) {
            completed += 1;
        }
    }
    completed
}

#[tokio::test(start_paused = true)]
async fn test_attempts_follow_queue_order() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C"], &sender, 300);
    let mut events = engine.subscribe();

    assert_eq!(engine.start().await, RunPhase::Running);
    let collected = collect_until_terminal(&mut events).await;

    assert_eq!(sender.attempted_addresses(), vec!["A", "B", "C"]);
    assert_eq!(recorded_indices(&collected), vec![0, 1, 2]);
    for snapshot in collected.iter().filter_map(DispatchEvent::snapshot) {
        assert_snapshot_invariants(snapshot);
        assert!(snapshot.in_flight <= 1, "one worker sends strictly in sequence");
    }

    match collected.last() {
        Some(DispatchEvent::Completed(summary)) => {
            assert_eq!(summary.sent_count, 3);
            assert_eq!(summary.failed_count, 0);
            assert_eq!(summary.total, 3);
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_terminates_after_exactly_total_attempts() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C", "D"], &sender, 500);

    engine.start().await;
    let summary = engine.wait_for_completion().await;

    assert_eq!(summary.phase, RunPhase::Completed);
    assert_eq!(summary.attempted(), 4);
    assert_eq!(sender.attempt_count(), 4);

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.pending_count, 0);
    assert_eq!(snapshot.progress_percentage, 100);
    assert!(snapshot.current_target.is_none());
    assert_eq!(engine.summary().await, Some(summary));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(sender.attempt_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_recorded_and_run_continues() {
    let sender = ScriptedSender::new()
        .reply_for("B", ScriptedReply::Reject("número não está no WhatsApp".to_string()))
        .reply_for("C", ScriptedReply::Error("timeout do gateway".to_string()));
    let engine = scripted_engine(&["A", "B", "C", "D"], &sender, 300);

    engine.start().await;
    let summary = engine.wait_for_completion().await;

    assert_eq!(summary.sent_count, 2);
    assert_eq!(summary.failed_count, 2);

    let outcomes = engine.outcomes().await;
    assert_eq!(outcomes[0], Some(Outcome::Success));
    assert_eq!(
        outcomes[1],
        Some(Outcome::failure("número não está no WhatsApp"))
    );
    assert_eq!(
        outcomes[2],
        Some(Outcome::failure(
            CampaignError::send_failed("timeout do gateway").to_string()
        ))
    );
    assert_eq!(outcomes[3], Some(Outcome::Success));

    let snapshot = engine.snapshot().await;
    assert!(snapshot.is_degraded());
}

#[tokio::test(start_paused = true)]
async fn test_pause_after_two_then_resume_sends_each_once() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C", "D", "E"], &sender, 1000);
    let mut watch = engine.watch();

    engine.start().await;
    wait_for_snapshot(&mut watch, |s| s.cursor == 2).await;
    assert_eq!(engine.pause().await, RunPhase::Paused);
    engine.wait_idle().await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    let paused = engine.snapshot().await;
    assert_eq!(paused.phase, RunPhase::Paused);
    assert_eq!(paused.cursor, 2);
    assert_eq!(paused.pending_count, 3);
    assert!(paused.current_target.is_none());
    assert_eq!(sender.attempt_count(), 2);

    assert_eq!(engine.resume().await, RunPhase::Running);
    let summary = engine.wait_for_completion().await;

    assert_eq!(summary.sent_count, 5);
    assert_eq!(
        sender.attempted_addresses(),
        vec!["A", "B", "C", "D", "E"],
        "no recipient repeated or skipped"
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_resumes_a_paused_run() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C"], &sender, 1000);
    let mut watch = engine.watch();

    engine.start().await;
    wait_for_snapshot(&mut watch, |s| s.cursor == 1).await;
    engine.pause().await;
    engine.wait_idle().await;

    assert_eq!(engine.start().await, RunPhase::Running);
    let summary = engine.wait_for_completion().await;
    assert_eq!(summary.sent_count, 3);
    assert_eq!(sender.attempted_addresses(), vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_pacing_delay_stops_run() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C"], &sender, 1000);
    let mut watch = engine.watch();
    let mut events = engine.subscribe();

    engine.start().await;
    wait_for_snapshot(&mut watch, |s| s.cursor == 1).await;
    assert_eq!(engine.cancel().await, RunPhase::Cancelled);

    let collected = collect_until_terminal(&mut events).await;
    match collected.last() {
        Some(DispatchEvent::Cancelled(summary)) => {
            assert_eq!(summary.sent_count, 1);
            assert_eq!(summary.not_attempted(), 2);
        }
        other => panic!("expected cancellation, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sender.attempt_count(), 1);

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.phase, RunPhase::Cancelled);
    assert!(snapshot.sent_count + snapshot.failed_count < snapshot.total);
    assert_snapshot_invariants(&snapshot);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_send_records_drained_attempt() {
    let gate = Arc::new(Semaphore::new(0));
    let sender = ScriptedSender::new().with_gate(Arc::clone(&gate));
    let engine = scripted_engine(&["A", "B", "C"], &sender, 300);
    let mut watch = engine.watch();
    let mut events = engine.subscribe();

    engine.start().await;
    let in_flight = wait_for_snapshot(&mut watch, |s| s.in_flight == 1).await;
    assert_eq!(
        in_flight.current_target.as_ref().map(|r| r.address.as_str()),
        Some("A")
    );

    assert_eq!(engine.cancel().await, RunPhase::Cancelled);
    assert!(
        engine.summary().await.is_none(),
        "summary waits for the in-flight send"
    );

    gate.add_permits(1);
    let collected = collect_until_terminal(&mut events).await;
    let recorded = collected
        .iter()
        .position(|e| matches!(e, DispatchEvent::AttemptRecorded { index: 0, .. }));
    let cancelled = collected
        .iter()
        .position(|e| matches!(e, DispatchEvent::Cancelled(_)));
    assert!(recorded < cancelled);

    engine.wait_idle().await;
    let summary = engine.summary().await.unwrap();
    assert_eq!(summary.phase, RunPhase::Cancelled);
    assert_eq!(summary.sent_count, 1);
    assert_eq!(sender.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_last_send_drained_while_paused_completes_on_resume() {
    let gate = Arc::new(Semaphore::new(0));
    let sender = ScriptedSender::new().with_gate(Arc::clone(&gate));
    let engine = scripted_engine(&["A"], &sender, 300);
    let mut watch = engine.watch();

    engine.start().await;
    wait_for_snapshot(&mut watch, |s| s.in_flight == 1).await;
    engine.pause().await;
    gate.add_permits(1);
    engine.wait_idle().await;

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.phase, RunPhase::Paused);
    assert_eq!(snapshot.cursor, 1);

    let mut events = engine.subscribe();
    assert_eq!(engine.resume().await, RunPhase::Completed);
    let collected = collect_until_terminal(&mut events).await;
    assert!(matches!(collected.last(), Some(DispatchEvent::Completed(_))));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.resume().await, RunPhase::Completed);
    assert_eq!(drain_completed(&mut events), 0);
    assert_eq!(sender.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completion_is_reported_once() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C"], &sender, 300);
    let mut events = engine.subscribe();

    engine.start().await;
    engine.wait_for_completion().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.start().await, RunPhase::Completed);
    assert_eq!(engine.resume().await, RunPhase::Completed);
    assert_eq!(engine.cancel().await, RunPhase::Completed);

    assert_eq!(drain_completed(&mut events), 1);
    assert_eq!(sender.attempt_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_recipients_complete_immediately() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&[], &sender, 300);
    let mut events = engine.subscribe();

    assert_eq!(engine.start().await, RunPhase::Completed);

    let collected = collect_until_terminal(&mut events).await;
    match collected.last() {
        Some(DispatchEvent::Completed(summary)) => {
            assert_eq!(summary.sent_count, 0);
            assert_eq!(summary.failed_count, 0);
            assert_eq!(summary.total, 0);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(engine.snapshot().await.progress_percentage, 100);
    assert_eq!(sender.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_capability_is_recorded_as_failure() {
    let sender = PanickingSender::new();
    let engine = engine_with(
        queue_of(&["A", "B", "C"]),
        Arc::new(sender.clone()),
        PacingConfig::fixed(300),
    );

    engine.start().await;
    let summary = engine.wait_for_completion().await;

    assert_eq!(summary.phase, RunPhase::Completed);
    assert_eq!(summary.sent_count, 0);
    assert_eq!(summary.failed_count, 3);
    assert_eq!(sender.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_panic_and_error_are_recorded_alike() {
    let panicking = ScriptedSender::new().reply_for("A", ScriptedReply::Panic("boom".to_string()));
    let failing = ScriptedSender::new().reply_for("A", ScriptedReply::Error("boom".to_string()));

    let mut summaries = Vec::new();
    for sender in [&panicking, &failing] {
        let engine = scripted_engine(&["A", "B"], sender, 300);
        engine.start().await;
        let summary = engine.wait_for_completion().await;

        let outcomes = engine.outcomes().await;
        assert!(matches!(outcomes[0], Some(Outcome::Failure { .. })));
        assert_eq!(outcomes[1], Some(Outcome::Success));
        summaries.push((summary.sent_count, summary.failed_count, summary.phase));
    }

    assert_eq!(summaries[0], summaries[1]);
}

#[tokio::test(start_paused = true)]
async fn test_commands_are_idempotent() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C"], &sender, 1000);

    assert_eq!(engine.pause().await, RunPhase::Idle);
    assert_eq!(engine.resume().await, RunPhase::Idle);
    assert_eq!(engine.cancel().await, RunPhase::Idle);

    engine.start().await;
    assert_eq!(engine.start().await, RunPhase::Running);
    engine.pause().await;
    engine.wait_idle().await;

    let before = engine.snapshot().await;
    assert_eq!(engine.pause().await, RunPhase::Paused);
    assert_eq!(engine.snapshot().await, before);

    engine.cancel().await;
    engine.wait_idle().await;
    let before = engine.snapshot().await;
    let mut events = engine.subscribe();
    for phase in [
        engine.cancel().await,
        engine.start().await,
        engine.resume().await,
        engine.pause().await,
    ] {
        assert_eq!(phase, RunPhase::Cancelled);
    }
    assert_eq!(engine.snapshot().await, before);
    assert!(events.try_recv().is_err(), "no-ops publish nothing");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_completion_is_noop() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A"], &sender, 300);

    engine.start().await;
    engine.wait_for_completion().await;

    assert_eq!(engine.cancel().await, RunPhase::Completed);
    assert_eq!(engine.summary().await.unwrap().phase, RunPhase::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_pacing_delay_between_attempts() {
    let sender = ScriptedSender::new();
    let engine = scripted_engine(&["A", "B", "C"], &sender, 300);

    let started = Instant::now();
    engine.start().await;
    engine.wait_for_completion().await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(600), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(900), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_start_delay_before_first_attempt() {
    let sender = ScriptedSender::new();
    let pacing = PacingConfig {
        min_delay_ms: 0,
        max_delay_ms: 0,
        start_delay_ms: 500,
    };
    let engine = engine_with(queue_of(&["A"]), Arc::new(sender.clone()), pacing);

    let started = Instant::now();
    engine.start().await;
    engine.wait_for_completion().await;

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(sender.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_placeholder_and_attachment_reach_capability() {
    let sender = ScriptedSender::new();
    let queue = RecipientQueueBuilder::new()
        .with_named("+5511987654321", "Ana Souza")
        .with_recipient("+5511987654322")
        .build();
    let attachment = Attachment::image("promo.png", "image/png", vec![0u8; 16]).unwrap();
    let engine = DispatchEngine::builder()
        .queue(queue)
        .message(Message::compose("Olá {nome}!", Some(attachment)).unwrap())
        .sender(Arc::new(sender.clone()))
        .pacing(PacingConfig::fixed(0))
        .build()
        .unwrap();

    engine.start().await;
    engine.wait_for_completion().await;

    let attempts = sender.attempts();
    assert_eq!(attempts[0].body, "Olá Ana Souza!");
    assert_eq!(attempts[1].body, "Olá !");
    assert!(attempts.iter().all(|a| a.had_attachment));
}

#[tokio::test(start_paused = true)]
async fn test_bounded_concurrency_keeps_counters_consistent() {
    let sender = ScriptedSender::new()
        .with_latency(Duration::from_millis(100))
        .reply_for("+5511000000003", ScriptedReply::Reject("bloqueado".to_string()));
    let queue = RecipientQueueBuilder::new().with_numbered(10).build();
    let engine = DispatchEngine::builder()
        .queue(queue.clone())
        .message(message("Oi {nome}"))
        .sender(Arc::new(sender.clone()))
        .pacing(PacingConfig::fixed(50))
        .max_concurrency(3)
        .build()
        .unwrap();
    let mut events = engine.subscribe();

    engine.start().await;
    let collected = collect_until_terminal(&mut events).await;

    let mut max_in_flight = 0;
    for snapshot in collected.iter().filter_map(DispatchEvent::snapshot) {
        assert_snapshot_invariants(snapshot);
        max_in_flight = max_in_flight.max(snapshot.in_flight);
    }
    assert_eq!(max_in_flight, 3);

    let summary = engine.wait_for_completion().await;
    assert_eq!(summary.sent_count, 9);
    assert_eq!(summary.failed_count, 1);

    let attempted: BTreeSet<_> = sender.attempted_addresses().into_iter().collect();
    let expected: BTreeSet<_> = queue.iter().map(|r| r.address.clone()).collect();
    assert_eq!(sender.attempt_count(), 10);
    assert_eq!(attempted, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_resume_churn_keeps_full_pacing_delay() {
    let sender = ScriptedSender::new();
    let pacing = PacingConfig {
        min_delay_ms: 40,
        max_delay_ms: 40,
        start_delay_ms: 40,
    };
    let engine = engine_with(
        queue_of(&["A", "B", "C", "D", "E", "F"]),
        Arc::new(sender.clone()),
        pacing,
    );

    engine.start().await;
    for cycle in 0..15u64 {
        tokio::time::sleep(Duration::from_millis(3 + (cycle * 7) % 37)).await;
        engine.pause().await;
        if cycle % 2 == 0 {
            tokio::task::yield_now().await;
        }
        engine.resume().await;
    }

    let summary = timeout(Duration::from_secs(10), engine.wait_for_completion())
        .await
        .expect("run did not finish");
    assert_eq!(summary.sent_count, 6);

    let attempts = sender.attempts();
    assert_eq!(attempts.len(), 6);
    for pair in attempts.windows(2) {
        let gap = pair[1].started_at.duration_since(pair[0].started_at);
        assert!(gap >= Duration::from_millis(40), "gap {:?} between attempts", gap);
    }
}

#[test]
fn test_builder_rejects_misconfiguration() {
    let missing_sender = DispatchEngine::builder()
        .queue(queue_of(&["A"]))
        .message(message("Oi"))
        .build();
    assert!(matches!(missing_sender, Err(CampaignError::Configuration(_))));

    let inverted = DispatchEngine::builder()
        .message(message("Oi"))
        .sender(Arc::new(ScriptedSender::new()))
        .pacing(PacingConfig {
            min_delay_ms: 800,
            max_delay_ms: 300,
            start_delay_ms: 0,
        })
        .build();
    assert!(matches!(inverted, Err(CampaignError::Configuration(_))));

    let no_workers = DispatchEngine::builder()
        .message(message("Oi"))
        .sender(Arc::new(ScriptedSender::new()))
        .dispatch(DispatchConfig {
            max_concurrency: 0,
            ..DispatchConfig::default()
        })
        .build();
    assert!(matches!(no_workers, Err(CampaignError::Configuration(_))));
}
