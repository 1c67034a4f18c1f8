use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use campaign_config::{DispatchConfig, PacingConfig};
use campaign_domain::{
    CampaignError, CampaignResult, CampaignSummary, DispatchEvent, Message, Outcome, RecipientQueue,
    RunPhase, RunSnapshot, SendCapability,
};

use crate::controller::ControlAction;
use crate::outcome::attempt;
use crate::pacing::{interruptible_sleep, JitterPacer};
use crate::run_state::RunState;

/// Drives one run over a fixed recipient queue and message.
///
/// Cloning yields another handle to the same run. Commands are idempotent
/// no-ops outside their valid phases; see [`ControlAction::target`].
#[derive(Clone)]
pub struct DispatchEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    state: RwLock<RunState>,
    sender: Arc<dyn SendCapability>,
    message: Message,
    placeholder: String,
    pacer: JitterPacer,
    start_delay: Duration,
    max_concurrency: usize,
    control_tx: watch::Sender<RunPhase>,
    snapshot_tx: watch::Sender<RunSnapshot>,
    events_tx: broadcast::Sender<DispatchEvent>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

pub struct DispatchEngineBuilder {
    queue: RecipientQueue,
    message: Option<Message>,
    sender: Option<Arc<dyn SendCapability>>,
    pacing: PacingConfig,
    dispatch: DispatchConfig,
}

impl Default for DispatchEngineBuilder {
    fn default() -> Self {
        Self {
            queue: RecipientQueue::default(),
            message: None,
            sender: None,
            pacing: PacingConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl DispatchEngineBuilder {
    pub fn queue(mut self, queue: RecipientQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn sender(mut self, sender: Arc<dyn SendCapability>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.dispatch.max_concurrency = max_concurrency;
        self
    }

    pub fn build(self) -> CampaignResult<DispatchEngine> {
        let sender = self
            .sender
            .ok_or_else(|| CampaignError::config_error("缺少发送能力(SendCapability)"))?;
        let message = self
            .message
            .ok_or_else(|| CampaignError::config_error("缺少待发送的消息"))?;
        self.pacing
            .validate()
            .map_err(|e| CampaignError::config_error(e.to_string()))?;
        self.dispatch
            .validate()
            .map_err(|e| CampaignError::config_error(e.to_string()))?;

        let state = RunState::new(self.queue);
        let (control_tx, _) = watch::channel(state.phase());
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let (events_tx, _) = broadcast::channel(self.dispatch.event_buffer);

        info!(
            run_id = %state.run_id(),
            total = state.total(),
            sender = sender.name(),
            max_concurrency = self.dispatch.max_concurrency,
            "创建分发引擎"
        );

        Ok(DispatchEngine {
            inner: Arc::new(EngineInner {
                state: RwLock::new(state),
                sender,
                message,
                placeholder: self.dispatch.placeholder,
                pacer: JitterPacer::from(&self.pacing),
                start_delay: self.pacing.start_delay(),
                max_concurrency: self.dispatch.max_concurrency,
                control_tx,
                snapshot_tx,
                events_tx,
                workers: Mutex::new(Vec::new()),
            }),
        })
    }
}

impl DispatchEngine {
    pub fn builder() -> DispatchEngineBuilder {
        DispatchEngineBuilder::default()
    }

    /// Idle/Paused -> Running. Returns the phase after the command.
    pub async fn start(&self) -> RunPhase {
        self.command(ControlAction::Start).await
    }

    /// Paused -> Running.
    pub async fn resume(&self) -> RunPhase {
        self.command(ControlAction::Resume).await
    }

    /// Running -> Paused. The attempt in flight finishes; nothing new is scheduled.
    pub async fn pause(&self) -> RunPhase {
        self.command(ControlAction::Pause).await
    }

    /// Running/Paused -> Cancelled. An in-flight send is not interrupted but
    /// its outcome is still recorded.
    pub async fn cancel(&self) -> RunPhase {
        self.command(ControlAction::Cancel).await
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        self.inner.state.read().await.snapshot()
    }

    pub async fn phase(&self) -> RunPhase {
        self.inner.state.read().await.phase()
    }

    /// Per-recipient outcomes in queue order; `None` for recipients not attempted yet.
    pub async fn outcomes(&self) -> Vec<Option<Outcome>> {
        self.inner.state.read().await.outcomes().to_vec()
    }

    /// Final tally once the run is terminal and in-flight attempts have drained.
    pub async fn summary(&self) -> Option<CampaignSummary> {
        let state = self.inner.state.read().await;
        (state.phase().is_terminal() && state.is_settled()).then(|| state.summary())
    }

    /// Every state mutation, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Latest snapshot; intermediate states may be skipped.
    pub fn watch(&self) -> watch::Receiver<RunSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Waits until no worker is running, i.e. the run is paused, terminal or
    /// was never started, with in-flight attempts drained.
    pub async fn wait_idle(&self) {
        loop {
            let handles: Vec<_> = self.inner.workers.lock().await.drain(..).collect();
            if handles.is_empty() {
                return;
            }
            for result in join_all(handles).await {
                if let Err(e) = result {
                    error!("分发工作协程异常退出: {}", e);
                }
            }
        }
    }

    /// Waits for a terminal phase and returns the summary.
    pub async fn wait_for_completion(&self) -> CampaignSummary {
        let mut rx = self.watch();
        let _ = rx.wait_for(|snapshot| snapshot.is_terminal()).await;
        self.wait_idle().await;
        self.inner.state.read().await.summary()
    }

    async fn command(&self, action: ControlAction) -> RunPhase {
        let mut state = self.inner.state.write().await;
        let Some(phase) = state.apply(action) else {
            return state.phase();
        };

        info!(run_id = %state.run_id(), "执行 {:?} 操作，当前阶段: {}", action, phase);
        self.inner.control_tx.send_replace(phase);
        self.inner.publish(&state);

        match phase {
            RunPhase::Running => {
                let missing = self.inner.max_concurrency.saturating_sub(state.active_workers());
                let mut workers = self.inner.workers.lock().await;
                workers.retain(|handle| !handle.is_finished());
                for worker_id in 0..missing {
                    state.worker_started();
                    let inner = Arc::clone(&self.inner);
                    workers.push(tokio::spawn(async move {
                        inner.run_worker(worker_id).await;
                    }));
                }
            }
            RunPhase::Completed => self.inner.report_completed(&state),
            RunPhase::Cancelled => {
                if state.take_cancel_report() {
                    self.inner.report_cancelled(&state);
                }
            }
            RunPhase::Idle | RunPhase::Paused => {}
        }

        phase
    }
}

impl EngineInner {
    fn publish(&self, state: &RunState) {
        let snapshot = state.snapshot();
        metrics::gauge!("campaign_inflight_attempts").set(snapshot.in_flight as f64);
        self.snapshot_tx.send_replace(snapshot.clone());
        let _ = self.events_tx.send(DispatchEvent::StateChanged(snapshot));
    }

    fn report_completed(&self, state: &RunState) {
        let summary = state.summary();
        info!(
            run_id = %summary.run_id,
            "活动发送完成: 成功 {}，失败 {}，共 {}",
            summary.sent_count, summary.failed_count, summary.total
        );
        self.control_tx.send_replace(RunPhase::Completed);
        let _ = self.events_tx.send(DispatchEvent::Completed(summary));
    }

    fn report_cancelled(&self, state: &RunState) {
        let summary = state.summary();
        info!(
            run_id = %summary.run_id,
            "活动已取消: 取消前已发送 {}，失败 {}，未发送 {}",
            summary.sent_count,
            summary.failed_count,
            summary.not_attempted()
        );
        let _ = self.events_tx.send(DispatchEvent::Cancelled(summary));
    }

    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        let mut control_rx = self.control_tx.subscribe();
        let mut delay = self.start_delay;

        loop {
            if !delay.is_zero() && !interruptible_sleep(delay, &mut control_rx).await {
                let mut state = self.state.write().await;
                if state.phase() == RunPhase::Running {
                    // 暂停后在取得锁之前又被恢复，重新计时
                    debug!(worker_id, "发送间隔被打断后已恢复，重新等待");
                    continue;
                }
                debug!(worker_id, "发送间隔被打断");
                self.exit_worker(&mut state, worker_id);
                return;
            }

            let claimed = {
                let mut state = self.state.write().await;
                match state.claim_next() {
                    Some(claimed) => {
                        self.publish(&state);
                        claimed
                    }
                    None => {
                        self.exit_worker(&mut state, worker_id);
                        return;
                    }
                }
            };
            let (index, recipient) = claimed;

            let body = self.message.render_for(&recipient, &self.placeholder);
            debug!(worker_id, index, recipient = %recipient, "发送消息");
            let outcome = attempt(
                self.sender.as_ref(),
                &recipient,
                &body,
                self.message.attachment(),
            )
            .await;

            match &outcome {
                Outcome::Success => {
                    metrics::counter!("campaign_messages_sent_total").increment(1);
                    debug!(index, recipient = %recipient, "发送成功");
                }
                Outcome::Failure { reason } => {
                    metrics::counter!("campaign_messages_failed_total").increment(1);
                    warn!(index, recipient = %recipient, "发送失败: {}", reason);
                }
            }

            {
                let mut state = self.state.write().await;
                let completed = state.record(index, outcome.clone());
                let _ = self.events_tx.send(DispatchEvent::AttemptRecorded {
                    index,
                    recipient,
                    outcome,
                });
                self.publish(&state);
                if completed {
                    self.report_completed(&state);
                }
                if state.phase() != RunPhase::Running || !state.has_unclaimed() {
                    self.exit_worker(&mut state, worker_id);
                    return;
                }
            }

            delay = self.pacer.next_delay();
        }
    }

    fn exit_worker(&self, state: &mut RunState, worker_id: usize) {
        debug!(worker_id, phase = %state.phase(), "分发工作协程退出");
        if state.worker_exited() {
            self.report_cancelled(state);
        }
    }
}
