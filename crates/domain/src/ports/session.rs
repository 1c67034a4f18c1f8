use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Identity of the paired device, usually its phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity(pub String);

impl SessionIdentity {
    /// Used when the gateway reports ready without naming the paired device.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }
}

impl std::fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingEvent {
    PairingCodeIssued(String),
    Connected(SessionIdentity),
    Failed(String),
}

pub type PairingStream = Pin<Box<dyn Stream<Item = PairingEvent> + Send>>;

/// Gateway connectivity. The dispatch engine never talks to it; callers gate
/// engine construction on having seen `Connected`.
#[async_trait]
pub trait SessionNegotiator: Send + Sync {
    /// Non-blocking readiness probe.
    async fn check_ready(&self) -> bool;

    async fn begin_pairing(&self) -> PairingStream;
}
