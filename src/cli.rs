use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};

use crate::app::{CampaignOptions, DEFAULT_MESSAGE};

pub fn build_cli() -> Command {
    Command::new("campaign")
        .version("1.0.0")
        .about("批量消息活动发送工具")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径 (默认查找 config/campaign.toml 或 campaign.toml)"),
        )
        .arg(
            Arg::new("recipients")
                .short('r')
                .long("recipients")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("收件人文件，每行 号码[,姓名]；缺省时使用演示联系人"),
        )
        .arg(
            Arg::new("message")
                .short('m')
                .long("message")
                .value_name("TEXT")
                .conflicts_with("message-file")
                .help("消息内容，{nome} 会被替换为收件人姓名"),
        )
        .arg(
            Arg::new("message-file")
                .long("message-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("从文件读取消息内容"),
        )
        .arg(
            Arg::new("attachment")
                .short('a')
                .long("attachment")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("图片附件 (最大5MB)"),
        )
        .arg(
            Arg::new("success-rate")
                .long("success-rate")
                .value_name("RATE")
                .value_parser(value_parser!(f64))
                .default_value("0.9")
                .help("模拟网关的投递成功率 (0到1)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
}

/// Reads the campaign inputs out of parsed arguments. A message file is read here.
pub async fn campaign_options(matches: &ArgMatches) -> Result<CampaignOptions> {
    let message = match (
        matches.get_one::<String>("message"),
        matches.get_one::<PathBuf>("message-file"),
    ) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取消息文件失败: {}", path.display()))?,
        (None, None) => DEFAULT_MESSAGE.to_string(),
    };

    Ok(CampaignOptions {
        recipients: matches.get_one::<PathBuf>("recipients").cloned(),
        message,
        attachment: matches.get_one::<PathBuf>("attachment").cloned(),
        success_rate: matches.get_one::<f64>("success-rate").copied().unwrap_or(0.9),
    })
}
