//! Operator commands typed on the console while a campaign runs.

use std::str::FromStr;

use campaign_domain::RunSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Pause,
    Resume,
    Cancel,
    Status,
    Help,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p" | "pause" | "pausar" => Ok(OperatorCommand::Pause),
            "r" | "resume" | "retomar" => Ok(OperatorCommand::Resume),
            "c" | "cancel" | "cancelar" => Ok(OperatorCommand::Cancel),
            "s" | "status" => Ok(OperatorCommand::Status),
            "h" | "?" | "help" | "ajuda" => Ok(OperatorCommand::Help),
            other => Err(format!("未知命令: {other}，输入 h 查看帮助")),
        }
    }
}

pub const HELP: &str = "命令: p 暂停 | r 继续 | c 取消 | s 状态 | h 帮助";

pub const CANCEL_PROMPT: &str =
    "确定要取消发送吗？已发送的消息不会撤回，剩余收件人将不会收到消息。(s/n)";

/// Answer to the cancel confirmation prompt.
pub fn is_confirmation(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "s" | "sim" | "y" | "yes" | "是"
    )
}

pub fn render_status(snapshot: &RunSnapshot) -> String {
    let target = snapshot
        .current_target
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let health = if snapshot.is_degraded() { " (失败率偏高)" } else { "" };

    format!(
        "[{}] {}% 成功 {} | 失败 {} | 待发送 {} | 当前: {}{}",
        snapshot.phase,
        snapshot.progress_percentage,
        snapshot.sent_count,
        snapshot.failed_count,
        snapshot.pending_count,
        target,
        health
    )
}
