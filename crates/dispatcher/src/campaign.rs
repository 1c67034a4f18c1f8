use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use campaign_config::{DispatchConfig, PacingConfig};
use campaign_domain::{
    CampaignError, CampaignResult, Message, RecipientQueue, SendCapability, SessionIdentity,
};

use crate::engine::DispatchEngine;

/// Where the operator is in the campaign flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStep {
    Connect,
    UploadRecipients,
    ComposeMessage,
    SendMessages,
}

/// One operator session: a connected identity, a recipient list and a
/// message, with at most one engine built from the current pair.
///
/// Replacing the recipients or the message cancels and drops the engine
/// built from the previous pair.
pub struct CampaignSession {
    sender: Arc<dyn SendCapability>,
    pacing: PacingConfig,
    dispatch: DispatchConfig,
    identity: Option<SessionIdentity>,
    recipients: Option<RecipientQueue>,
    message: Option<Message>,
    engine: Option<DispatchEngine>,
}

impl std::fmt::Debug for CampaignSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignSession")
            .field("pacing", &self.pacing)
            .field("dispatch", &self.dispatch)
            .field("identity", &self.identity)
            .field("recipients", &self.recipients)
            .field("message", &self.message)
            .field("has_engine", &self.engine.is_some())
            .finish_non_exhaustive()
    }
}

impl CampaignSession {
    pub fn new(sender: Arc<dyn SendCapability>, pacing: PacingConfig, dispatch: DispatchConfig) -> Self {
        Self {
            sender,
            pacing,
            dispatch,
            identity: None,
            recipients: None,
            message: None,
            engine: None,
        }
    }

    pub fn step(&self) -> CampaignStep {
        if self.identity.is_none() {
            CampaignStep::Connect
        } else if self.recipients.is_none() {
            CampaignStep::UploadRecipients
        } else if self.engine.is_none() {
            CampaignStep::ComposeMessage
        } else {
            CampaignStep::SendMessages
        }
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn recipients(&self) -> Option<&RecipientQueue> {
        self.recipients.as_ref()
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn engine(&self) -> Option<&DispatchEngine> {
        self.engine.as_ref()
    }

    pub fn connected(&mut self, identity: SessionIdentity) {
        info!("会话已连接: {}", identity);
        self.identity = Some(identity);
    }

    pub async fn load_recipients(&mut self, recipients: RecipientQueue) -> CampaignResult<()> {
        if self.identity.is_none() {
            return Err(CampaignError::session_not_ready("请先连接会话再上传收件人"));
        }
        if recipients.is_empty() {
            return Err(CampaignError::invalid_recipient("收件人列表为空"));
        }
        self.discard_engine().await;
        info!("已加载 {} 个收件人", recipients.len());
        self.recipients = Some(recipients);
        Ok(())
    }

    /// Builds a fresh engine for the current recipients and `message`. The
    /// engine starts `Idle`.
    pub async fn compose(&mut self, message: Message) -> CampaignResult<&DispatchEngine> {
        let Some(recipients) = self.recipients.clone() else {
            return Err(CampaignError::validation_error("请先上传收件人列表"));
        };
        let engine = DispatchEngine::builder()
            .queue(recipients)
            .message(message.clone())
            .sender(Arc::clone(&self.sender))
            .pacing(self.pacing.clone())
            .dispatch(self.dispatch.clone())
            .build()?;

        self.discard_engine().await;
        self.message = Some(message);
        Ok(self.engine.insert(engine))
    }

    /// Drops everything back to `Connect`.
    pub async fn reset(&mut self) {
        self.discard_engine().await;
        self.identity = None;
        self.recipients = None;
        self.message = None;
        info!("会话已重置");
    }

    async fn discard_engine(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.cancel().await;
        }
    }
}
