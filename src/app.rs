use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use campaign_config::AppConfig;
use campaign_dispatcher::{CampaignSession, DispatchEngine, DispatchEvent};
use campaign_domain::{Attachment, CampaignSummary, Message, SessionNegotiator};

use crate::demo::{DemoSessionNegotiator, SimulatedSender};
use crate::operator::{is_confirmation, render_status, OperatorCommand, CANCEL_PROMPT, HELP};
use crate::recipients::{demo_recipients, load_recipients};
use crate::session::wait_until_connected;
use crate::shutdown::wait_for_shutdown;

pub const DEFAULT_MESSAGE: &str =
    "Olá {nome}! Temos uma novidade especial para você. Responda esta mensagem para saber mais.";

/// 单次活动的输入
#[derive(Debug, Clone)]
pub struct CampaignOptions {
    pub recipients: Option<PathBuf>,
    pub message: String,
    pub attachment: Option<PathBuf>,
    pub success_rate: f64,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            recipients: None,
            message: DEFAULT_MESSAGE.to_string(),
            attachment: None,
            success_rate: 0.9,
        }
    }
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    options: CampaignOptions,
    negotiator: Arc<dyn SessionNegotiator>,
}

impl Application {
    pub fn new(config: AppConfig, options: CampaignOptions) -> Self {
        let negotiator = Arc::new(DemoSessionNegotiator::new(
            config.session.demo_pairing_delay(),
        ));
        Self::with_negotiator(config, options, negotiator)
    }

    pub fn with_negotiator(
        config: AppConfig,
        options: CampaignOptions,
        negotiator: Arc<dyn SessionNegotiator>,
    ) -> Self {
        Self {
            config,
            options,
            negotiator,
        }
    }

    /// 连接会话、加载收件人并编写消息，返回处于待发送状态的活动会话
    pub async fn prepare(&self) -> Result<CampaignSession> {
        let sender = SimulatedSender::new(self.options.success_rate).context("创建发送器失败")?;
        let mut session = CampaignSession::new(
            Arc::new(sender),
            self.config.pacing.clone(),
            self.config.dispatch.clone(),
        );

        info!("等待会话连接...");
        let identity =
            wait_until_connected(self.negotiator.as_ref(), self.config.session.ready_timeout())
                .await
                .context("会话连接失败")?;
        session.connected(identity);

        let recipients = match &self.options.recipients {
            Some(path) => load_recipients(path).await?,
            None => {
                info!("未指定收件人文件，使用演示联系人列表");
                demo_recipients()
            }
        };
        session
            .load_recipients(recipients)
            .await
            .context("加载收件人失败")?;

        let attachment = match &self.options.attachment {
            Some(path) => Some(load_attachment(path).await?),
            None => None,
        };
        let message =
            Message::compose(self.options.message.clone(), attachment).context("消息无效")?;
        session.compose(message).await.context("创建分发引擎失败")?;

        Ok(session)
    }

    /// 启动发送并处理操作员命令，直到活动完成或被取消
    pub async fn run<R>(
        &self,
        session: &CampaignSession,
        input: R,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<CampaignSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let engine = session.engine().cloned().context("活动尚未准备好")?;
        let reporter = tokio::spawn(report_progress(engine.subscribe()));

        println!("{HELP}");
        engine.start().await;

        let completion = engine.wait_for_completion();
        tokio::pin!(completion);

        let mut lines = input.lines();
        let mut input_open = true;
        let mut shutdown_seen = false;
        let mut confirming_cancel = false;

        let summary = loop {
            tokio::select! {
                summary = &mut completion => break summary,
                _ = wait_for_shutdown(&mut shutdown_rx), if !shutdown_seen => {
                    shutdown_seen = true;
                    warn!("收到关闭信号，取消活动");
                    engine.cancel().await;
                }
                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) => {
                        confirming_cancel = handle_input(&engine, &line, confirming_cancel).await;
                    }
                    Ok(None) => {
                        debug!("操作员输入已关闭");
                        input_open = false;
                    }
                    Err(e) => {
                        warn!("读取操作员输入失败: {}", e);
                        input_open = false;
                    }
                },
            }
        };

        if let Err(e) = reporter.await {
            warn!("进度报告任务异常退出: {}", e);
        }
        Ok(summary)
    }
}

/// Returns whether a cancel confirmation is now pending.
async fn handle_input(engine: &DispatchEngine, line: &str, confirming_cancel: bool) -> bool {
    if confirming_cancel {
        if is_confirmation(line) {
            engine.cancel().await;
        } else {
            println!("已放弃取消，继续发送");
        }
        return false;
    }

    if line.trim().is_empty() {
        return false;
    }

    match line.parse::<OperatorCommand>() {
        Ok(OperatorCommand::Pause) => {
            let phase = engine.pause().await;
            println!("当前状态: {phase}");
        }
        Ok(OperatorCommand::Resume) => {
            let phase = engine.resume().await;
            println!("当前状态: {phase}");
        }
        Ok(OperatorCommand::Cancel) => {
            if engine.phase().await.is_terminal() {
                println!("活动已结束");
            } else {
                println!("{CANCEL_PROMPT}");
                return true;
            }
        }
        Ok(OperatorCommand::Status) => println!("{}", render_status(&engine.snapshot().await)),
        Ok(OperatorCommand::Help) => println!("{HELP}"),
        Err(e) => println!("{e}"),
    }
    false
}

async fn report_progress(mut events: broadcast::Receiver<DispatchEvent>) {
    loop {
        match events.recv().await {
            Ok(DispatchEvent::AttemptRecorded {
                index,
                recipient,
                outcome,
            }) => {
                debug!(index, recipient = %recipient, ?outcome, "记录发送结果");
            }
            Ok(DispatchEvent::StateChanged(snapshot)) => {
                if snapshot.in_flight == 0 {
                    info!("{}", render_status(&snapshot));
                }
            }
            Ok(DispatchEvent::Completed(_)) | Ok(DispatchEvent::Cancelled(_)) => return,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("进度报告落后，跳过 {} 个事件", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

pub async fn load_attachment(path: &Path) -> Result<Attachment> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("读取附件失败: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let attachment = Attachment::image(file_name, content_type_for(path), data)
        .with_context(|| format!("附件无效: {}", path.display()))?;
    info!("已加载附件 {} ({} 字节)", attachment.file_name, attachment.size());
    Ok(attachment)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
