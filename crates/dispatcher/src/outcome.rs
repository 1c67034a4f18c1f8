use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use campaign_domain::{Attachment, CampaignResult, Delivery, Outcome, Recipient, SendCapability};

/// Maps a send result onto an [`Outcome`]. Any error or rejection is a failure.
pub fn classify(result: CampaignResult<Delivery>) -> Outcome {
    match result {
        Ok(Delivery::Accepted) => Outcome::Success,
        Ok(Delivery::Rejected { reason }) => Outcome::failure(reason),
        Err(e) => Outcome::failure(e.to_string()),
    }
}

/// Runs one send. A panic inside the capability is caught and recorded like
/// any other failure so it never takes the run loop down.
pub async fn attempt(
    sender: &dyn SendCapability,
    recipient: &Recipient,
    rendered_body: &str,
    attachment: Option<&Attachment>,
) -> Outcome {
    match AssertUnwindSafe(sender.send(recipient, rendered_body, attachment))
        .catch_unwind()
        .await
    {
        Ok(result) => classify(result),
        Err(payload) => Outcome::failure(format!(
            "send capability panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
