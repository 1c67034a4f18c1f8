//! Test doubles for the send capability and the session negotiator.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use campaign_domain::{
    Attachment, Delivery, PairingEvent, PairingStream, Recipient, SendCapability,
    SessionNegotiator,
};
use campaign_errors::{CampaignError, CampaignResult};

/// What a [`ScriptedSender`] does for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Accept,
    Reject(String),
    Error(String),
    Panic(String),
}

/// One call observed by a [`ScriptedSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    pub address: String,
    pub body: String,
    pub had_attachment: bool,
    pub started_at: Instant,
}

/// Send capability with scripted replies.
///
/// Replies are picked per address first, then from the ordered script, and
/// default to [`ScriptedReply::Accept`]. Every call is logged before it
/// replies, so a gated attempt shows up as in flight.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSender {
    by_address: Arc<Mutex<HashMap<String, ScriptedReply>>>,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    attempts: Arc<Mutex<Vec<SendAttempt>>>,
    gate: Option<Arc<Semaphore>>,
    latency: Duration,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(replies: Vec<ScriptedReply>) -> Self {
        let sender = Self::new();
        sender.script.lock().unwrap().extend(replies);
        sender
    }

    pub fn reply_for(self, address: &str, reply: ScriptedReply) -> Self {
        self.by_address
            .lock()
            .unwrap()
            .insert(address.to_string(), reply);
        self
    }

    /// Each attempt consumes one permit before replying.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn attempts(&self) -> Vec<SendAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempted_addresses(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.address.clone())
            .collect()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    fn next_reply(&self, address: &str) -> ScriptedReply {
        if let Some(reply) = self.by_address.lock().unwrap().get(address) {
            return reply.clone();
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedReply::Accept)
    }
}

#[async_trait]
impl SendCapability for ScriptedSender {
    async fn send(
        &self,
        recipient: &Recipient,
        rendered_body: &str,
        attachment: Option<&Attachment>,
    ) -> CampaignResult<Delivery> {
        self.attempts.lock().unwrap().push(SendAttempt {
            address: recipient.address.clone(),
            body: rendered_body.to_string(),
            had_attachment: attachment.is_some(),
            started_at: Instant::now(),
        });
        let reply = self.next_reply(&recipient.address);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| CampaignError::Internal(e.to_string()))?
                .forget();
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            ScriptedReply::Accept => Ok(Delivery::Accepted),
            ScriptedReply::Reject(reason) => Ok(Delivery::Rejected { reason }),
            ScriptedReply::Error(reason) => Err(CampaignError::send_failed(reason)),
            ScriptedReply::Panic(message) => panic!("{}", message),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Send capability that panics on every call.
#[derive(Debug, Clone, Default)]
pub struct PanickingSender {
    calls: Arc<AtomicUsize>,
}

impl PanickingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SendCapability for PanickingSender {
    async fn send(
        &self,
        recipient: &Recipient,
        _rendered_body: &str,
        _attachment: Option<&Attachment>,
    ) -> CampaignResult<Delivery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("gateway driver crashed on {}", recipient.address);
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Session negotiator replaying a fixed list of pairing events.
#[derive(Debug, Clone, Default)]
pub struct MockSessionNegotiator {
    ready: Arc<AtomicBool>,
    events: Arc<Mutex<Vec<PairingEvent>>>,
    pairing_calls: Arc<AtomicUsize>,
}

impl MockSessionNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready() -> Self {
        let negotiator = Self::new();
        negotiator.set_ready(true);
        negotiator
    }

    pub fn with_events(events: Vec<PairingEvent>) -> Self {
        let negotiator = Self::new();
        *negotiator.events.lock().unwrap() = events;
        negotiator
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn pairing_calls(&self) -> usize {
        self.pairing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionNegotiator for MockSessionNegotiator {
    async fn check_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn begin_pairing(&self) -> PairingStream {
        self.pairing_calls.fetch_add(1, Ordering::SeqCst);
        let events = self.events.lock().unwrap().clone();
        Box::pin(stream::iter(events))
    }
}
