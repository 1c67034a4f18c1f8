use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campaign::app::Application;
use campaign::cli::{build_cli, campaign_options};
use campaign::shutdown::ShutdownManager;
use campaign_config::{AppConfig, LogLevel, OutputFormat};
use campaign_domain::{CampaignError, RunPhase};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = build_cli().get_matches();
    let config_path = matches.get_one::<String>("config").map(String::as_str);

    // 加载配置，命令行参数优先
    let mut config = AppConfig::load(config_path).context("加载配置失败")?;
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format =
            format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?;
    }

    init_logging(config.observability.log_level, config.observability.log_format)?;

    info!("启动批量消息活动");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let options = campaign_options(&matches).await?;
    let app = Application::new(config, options);

    // 创建优雅关闭管理器
    let shutdown_manager = ShutdownManager::new();
    let signal_task = {
        let shutdown_manager = shutdown_manager.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            shutdown_manager.shutdown();
        })
    };

    let session = match app.prepare().await {
        Ok(session) => session,
        Err(e) => {
            if let Some(campaign_error) = e.downcast_ref::<CampaignError>() {
                eprintln!("{}", campaign_error.user_message());
            }
            return Err(e);
        }
    };
    let summary = app
        .run(
            &session,
            BufReader::new(tokio::io::stdin()),
            shutdown_manager.subscribe(),
        )
        .await?;
    signal_task.abort();

    println!(
        "活动{}: 成功 {} | 失败 {} | 未发送 {} | 共 {}",
        if summary.phase == RunPhase::Completed {
            "完成"
        } else {
            "已取消"
        },
        summary.sent_count,
        summary.failed_count,
        summary.not_attempted(),
        summary.total
    );

    info!("批量消息活动已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: LogLevel, log_format: OutputFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        OutputFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        OutputFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
