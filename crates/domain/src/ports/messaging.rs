use async_trait::async_trait;
use campaign_errors::CampaignResult;

use crate::entities::{Attachment, Recipient};
use crate::value_objects::Delivery;

/// Gateway send operation supplied by the surrounding application.
///
/// Implementations own their timeout policy. `Err` and `Delivery::Rejected`
/// are both recorded as a failed attempt; neither aborts the run.
#[async_trait]
pub trait SendCapability: Send + Sync {
    async fn send(
        &self,
        recipient: &Recipient,
        rendered_body: &str,
        attachment: Option<&Attachment>,
    ) -> CampaignResult<Delivery>;

    fn name(&self) -> &str {
        "send-capability"
    }
}
