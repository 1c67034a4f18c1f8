//! Stand-in gateway used when the binary runs without a real messaging backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use rand::Rng;
use tracing::debug;

use campaign_domain::{
    Attachment, CampaignError, CampaignResult, Delivery, PairingEvent, PairingStream, Recipient,
    SendCapability, SessionIdentity, SessionNegotiator,
};

pub const DEMO_IDENTITY: &str = "+55 11 98765-4321";

/// Accepts each message with probability `success_rate` after a short
/// random latency.
#[derive(Debug, Clone)]
pub struct SimulatedSender {
    success_rate: f64,
    min_latency_ms: u64,
    max_latency_ms: u64,
}

impl SimulatedSender {
    pub fn new(success_rate: f64) -> CampaignResult<Self> {
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(CampaignError::config_error(format!(
                "成功率必须在0到1之间，当前: {success_rate}"
            )));
        }
        Ok(Self {
            success_rate,
            min_latency_ms: 50,
            max_latency_ms: 250,
        })
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for SimulatedSender {
    fn default() -> Self {
        Self {
            success_rate: 0.9,
            min_latency_ms: 50,
            max_latency_ms: 250,
        }
    }
}

#[async_trait]
impl SendCapability for SimulatedSender {
    async fn send(
        &self,
        recipient: &Recipient,
        rendered_body: &str,
        attachment: Option<&Attachment>,
    ) -> CampaignResult<Delivery> {
        let (latency, accepted) = {
            let mut rng = rand::rng();
            let latency = rng.random_range(self.min_latency_ms..=self.max_latency_ms);
            (latency, rng.random_bool(self.success_rate))
        };
        tokio::time::sleep(Duration::from_millis(latency)).await;

        debug!(
            recipient = %recipient.address,
            body_len = rendered_body.len(),
            attachment = attachment.map(|a| a.file_name.as_str()),
            latency_ms = latency,
            "模拟发送"
        );

        if accepted {
            Ok(Delivery::Accepted)
        } else {
            Err(CampaignError::Network(format!(
                "模拟网关未能投递到 {}",
                recipient.address
            )))
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Pairs after a fixed delay: issues a code, then reports the demo identity.
#[derive(Debug, Clone)]
pub struct DemoSessionNegotiator {
    pairing_delay: Duration,
}

impl DemoSessionNegotiator {
    pub fn new(pairing_delay: Duration) -> Self {
        Self { pairing_delay }
    }
}

#[async_trait]
impl SessionNegotiator for DemoSessionNegotiator {
    async fn check_ready(&self) -> bool {
        false
    }

    async fn begin_pairing(&self) -> PairingStream {
        let code = {
            let mut rng = rand::rng();
            format!(
                "{:04}-{:04}",
                rng.random_range(0..10_000),
                rng.random_range(0..10_000)
            )
        };
        let delay = self.pairing_delay;

        let steps = stream::iter([
            (Duration::ZERO, PairingEvent::PairingCodeIssued(code)),
            (
                delay,
                PairingEvent::Connected(SessionIdentity(DEMO_IDENTITY.to_string())),
            ),
        ]);
        Box::pin(steps.then(|(wait, event)| async move {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            event
        }))
    }
}
