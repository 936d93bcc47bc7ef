//! Push Alarm Relay CLI
//!
//! 接收推送消息、查看通知历史、通过推送网关转发通知

use anyhow::Result;
use clap::{Parser, Subcommand};
use push_alarm_relay::cli::{self, ListenArgs, RouteArgs, SendArgs};
use push_alarm_relay::{Config, StorageKind};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "par")]
#[command(about = "Push Alarm Relay - 推送通知转发和告警")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/push-alarm-relay/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 存储后端（覆盖配置）
    #[arg(long, global = true, value_enum)]
    storage: Option<StorageKind>,

    /// 存储目录（覆盖配置）
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 从 stdin 读取推送消息（每行一个 JSON）并路由
    Listen(ListenArgs),
    /// 路由一条消息，有告警时等待告警结束
    Route(RouteArgs),
    /// 列出最近的通知
    Recent {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 通知条数
    Count,
    /// 清空通知历史
    Clear,
    /// 通过推送网关发送通知或告警
    Send(SendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug par listen
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("push_alarm_relay=info,par=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::path);
    let mut config = Config::load_from(&config_path)?;
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }
    debug!(path = %config_path.display(), storage = ?config.storage, "Loaded config");

    match cli.command {
        Commands::Listen(args) => {
            cli::handle_listen(config, config_path, args).await?;
        }
        Commands::Route(args) => {
            cli::handle_route(config, args).await?;
        }
        Commands::Recent { json } => {
            let store = cli::open_store(&config).await?;
            cli::handle_recent(&store, json)?;
        }
        Commands::Count => {
            let store = cli::open_store(&config).await?;
            cli::handle_count(&store)?;
        }
        Commands::Clear => {
            let store = cli::open_store(&config).await?;
            cli::handle_clear(&store).await?;
        }
        Commands::Send(args) => {
            cli::handle_send(config.relay, args).await?;
        }
    }

    Ok(())
}
