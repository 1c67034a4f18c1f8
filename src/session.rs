//! Gate that holds the campaign back until the gateway session is paired.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::timeout;
use tracing::{info, warn};

use campaign_domain::{
    CampaignError, CampaignResult, PairingEvent, SessionIdentity, SessionNegotiator,
};

/// Returns at once when the gateway already reports ready. Otherwise consumes
/// the pairing stream until `Connected`, logging any pairing codes.
///
/// Fails with `SessionNotReady` on timeout or when the stream ends first, and
/// with `PairingFailed` when the negotiator reports a failure.
pub async fn wait_until_connected(
    negotiator: &dyn SessionNegotiator,
    ready_timeout: Duration,
) -> CampaignResult<SessionIdentity> {
    if negotiator.check_ready().await {
        info!("会话已就绪，跳过配对");
        return Ok(SessionIdentity::unknown());
    }
    let mut events = negotiator.begin_pairing().await;

    let pairing = async {
        while let Some(event) = events.next().await {
            match event {
                PairingEvent::PairingCodeIssued(code) => {
                    info!("配对码: {}，请在手机上输入以连接会话", code);
                }
                PairingEvent::Connected(identity) => {
                    info!("会话已连接: {}", identity);
                    return Ok(identity);
                }
                PairingEvent::Failed(reason) => {
                    warn!("配对失败: {}", reason);
                    return Err(CampaignError::PairingFailed(reason));
                }
            }
        }
        Err(CampaignError::session_not_ready("配对流在连接前结束"))
    };

    match timeout(ready_timeout, pairing).await {
        Ok(result) => result,
        Err(_) => Err(CampaignError::session_not_ready(format!(
            "等待会话连接超时({}秒)",
            ready_timeout.as_secs()
        ))),
    }
}
