use thiserror::Error;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("无效的收件人: {0}")]
    InvalidRecipient(String),
    #[error("无效的消息: {0}")]
    InvalidMessage(String),
    #[error("会话未就绪: {0}")]
    SessionNotReady(String),
    #[error("配对失败: {0}")]
    PairingFailed(String),
    #[error("发送失败: {0}")]
    SendFailed(String),
    #[error("网络错误: {0}")]
    Network(String),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type CampaignResult<T> = Result<T, CampaignError>;

impl CampaignError {
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn invalid_recipient<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRecipient(msg.into())
    }
    pub fn invalid_message<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMessage(msg.into())
    }
    pub fn send_failed<S: Into<String>>(msg: S) -> Self {
        Self::SendFailed(msg.into())
    }
    pub fn session_not_ready<S: Into<String>>(msg: S) -> Self {
        Self::SessionNotReady(msg.into())
    }
    pub fn user_message(&self) -> &str {
        match self {
            CampaignError::InvalidRecipient(_) => "收件人列表格式有误",
            CampaignError::InvalidMessage(_) => "请先编写消息内容",
            CampaignError::ValidationError(_) => "输入数据验证失败",
            CampaignError::SessionNotReady(_) | CampaignError::PairingFailed(_) => {
                "消息网关未连接，请重新配对"
            }
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<anyhow::Error> for CampaignError {
    fn from(err: anyhow::Error) -> Self {
        CampaignError::Internal(err.to_string())
    }
}
