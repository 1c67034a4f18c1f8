//! Builders for recipient queues with sensible defaults.

use campaign_domain::{Recipient, RecipientQueue};

#[derive(Debug, Default)]
pub struct RecipientQueueBuilder {
    recipients: Vec<Recipient>,
}

impl RecipientQueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipient(mut self, address: &str) -> Self {
        self.recipients
            .push(Recipient::new(address).expect("test address must not be blank"));
        self
    }

    pub fn with_named(mut self, address: &str, name: &str) -> Self {
        self.recipients.push(
            Recipient::with_name(address, name).expect("test address must not be blank"),
        );
        self
    }

    /// Appends `count` recipients `+55110000000<i>` named `Contato <i>`.
    pub fn with_numbered(mut self, count: usize) -> Self {
        let offset = self.recipients.len();
        for i in offset..offset + count {
            let recipient = Recipient::with_name(format!("+5511{:09}", i), format!("Contato {}", i))
                .expect("generated address is never blank");
            self.recipients.push(recipient);
        }
        self
    }

    pub fn build(self) -> RecipientQueue {
        RecipientQueue::new(self.recipients)
    }
}

/// Queue of unnamed recipients with the given addresses.
pub fn queue_of(addresses: &[&str]) -> RecipientQueue {
    addresses
        .iter()
        .fold(RecipientQueueBuilder::new(), |builder, address| {
            builder.with_recipient(address)
        })
        .build()
}
