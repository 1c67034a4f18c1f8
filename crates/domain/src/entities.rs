use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use campaign_errors::{CampaignError, CampaignResult};

use crate::template::render_body;

/// Largest attachment the gateway accepts.
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecipientRecord")]
pub struct Recipient {
    pub address: String,
    pub display_name: Option<String>,
}

/// Wire form of [`Recipient`]; deserialization goes through the same checks as the constructors.
#[derive(Deserialize)]
struct RecipientRecord {
    address: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl TryFrom<RecipientRecord> for Recipient {
    type Error = CampaignError;

    fn try_from(record: RecipientRecord) -> CampaignResult<Self> {
        match record.display_name {
            Some(name) => Self::with_name(record.address, name),
            None => Self::new(record.address),
        }
    }
}

impl Recipient {
    pub fn new<A: Into<String>>(address: A) -> CampaignResult<Self> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(CampaignError::invalid_recipient("收件人地址不能为空"));
        }
        Ok(Self {
            address,
            display_name: None,
        })
    }

    pub fn with_name<A: Into<String>, N: Into<String>>(address: A, name: N) -> CampaignResult<Self> {
        let mut recipient = Self::new(address)?;
        let name = name.into().trim().to_string();
        recipient.display_name = (!name.is_empty()).then_some(name);
        Ok(recipient)
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Sem nome")
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{name} ({})", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Ordered, immutable recipient list for one run. Cloning is cheap and shares
/// the underlying storage. Duplicate addresses are kept and sent twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientQueue {
    recipients: Arc<[Recipient]>,
}

impl RecipientQueue {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients: recipients.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Recipient> {
        self.recipients.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients.iter()
    }

    pub fn as_slice(&self) -> &[Recipient] {
        &self.recipients
    }
}

impl From<Vec<Recipient>> for RecipientQueue {
    fn from(recipients: Vec<Recipient>) -> Self {
        Self::new(recipients)
    }
}

impl FromIterator<Recipient> for RecipientQueue {
    fn from_iter<I: IntoIterator<Item = Recipient>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Arc<[u8]>,
}

impl Attachment {
    /// Image attachment, the only kind the composer accepts.
    pub fn image<F, C>(file_name: F, content_type: C, data: Vec<u8>) -> CampaignResult<Self>
    where
        F: Into<String>,
        C: Into<String>,
    {
        let content_type = content_type.into();
        if !content_type.starts_with("image/") {
            return Err(CampaignError::invalid_message(format!(
                "只支持图片附件，当前类型: {content_type}"
            )));
        }
        if data.len() > MAX_ATTACHMENT_BYTES {
            return Err(CampaignError::invalid_message(format!(
                "附件过大: {} 字节，上限 {} 字节",
                data.len(),
                MAX_ATTACHMENT_BYTES
            )));
        }
        Ok(Self {
            file_name: file_name.into(),
            content_type,
            data: data.into(),
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    body: String,
    attachment: Option<Attachment>,
}

impl Message {
    /// Rejects a blank body; the composer never lets one through.
    pub fn compose<B: Into<String>>(body: B, attachment: Option<Attachment>) -> CampaignResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(CampaignError::invalid_message("消息内容不能为空"));
        }
        Ok(Self { body, attachment })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn render_for(&self, recipient: &Recipient, placeholder: &str) -> String {
        render_body(&self.body, placeholder, recipient.display_name.as_deref())
    }
}
