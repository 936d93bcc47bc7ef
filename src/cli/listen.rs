// src/cli/listen.rs
//! Listen / Route 命令 - 接收推送消息并按类型路由
//!
//! `listen` 从 stdin 逐行读取 JSON 消息（每行一个 `InboundMessage`），
//! 单独一行 `stop` 相当于点击告警界面上的停止按钮。
//! stdin 关闭或 Ctrl-C 时关闭告警会话，正在响的告警随之停止。

use super::output::{format_json, format_outcome};
use super::storage::open_store;
use crate::alarm::{AlarmSession, TerminalPlatform};
use crate::config::{Config, FilePreferences, Preferences, StaticPreferences};
use crate::notification::{InboundMessage, MessageRouter};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// 停止告警的输入行
const STOP_COMMAND: &str = "stop";

/// Listen 命令参数
#[derive(Args, Debug)]
pub struct ListenArgs {
    /// 每条消息的路由结果输出为 JSON 行
    #[arg(long)]
    pub json: bool,

    /// 关闭终端响铃（告警仍会展示）
    #[arg(long)]
    pub silent: bool,
}

/// Route 命令参数
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// 消息类型（alarm / alert 触发告警，其余按普通通知）
    #[arg(long = "type", short = 't')]
    pub kind: Option<String>,

    /// 标题
    #[arg(long, default_value = "")]
    pub title: String,

    /// 正文
    #[arg(long, default_value = "")]
    pub body: String,

    /// 不升级为告警（覆盖配置）
    #[arg(long)]
    pub no_alarm: bool,

    /// 自动停止时间（秒，覆盖配置）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 关闭终端响铃
    #[arg(long)]
    pub silent: bool,
}

fn terminal_platform(silent: bool) -> Arc<TerminalPlatform> {
    let platform = TerminalPlatform::new();
    Arc::new(if silent { platform.without_bell() } else { platform })
}

/// 处理 listen 命令
pub async fn handle_listen(config: Config, config_path: PathBuf, args: ListenArgs) -> Result<()> {
    let store = open_store(&config).await?;
    let platform = terminal_platform(args.silent);
    let session = AlarmSession::spawn(platform.clone());
    let router = MessageRouter::new(store, session.clone()).with_surface(platform.clone());
    let preferences = FilePreferences::new(config_path, config);

    info!("Listening for messages on stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(e) = handle_line(&router, &platform, &preferences, &line, args.json).await {
                        break Err(e);
                    }
                }
                Ok(None) => {
                    info!("stdin closed, shutting down");
                    break Ok(());
                }
                Err(e) => break Err(e.into()),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break Ok(());
            }
        }
    };

    session.shutdown().await;
    result
}

async fn handle_line(
    router: &MessageRouter,
    platform: &TerminalPlatform,
    preferences: &dyn Preferences,
    line: &str,
    json: bool,
) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    if line.eq_ignore_ascii_case(STOP_COMMAND) {
        // 优先走界面上的停止按钮，按钮已失效时直接停止当前会话
        let stopped = platform.press_stop() || router.alarm().stop().await;
        debug!(stopped, "Stop requested from stdin");
        if !stopped {
            eprintln!("No alarm is sounding");
        }
        return Ok(());
    }

    let message: InboundMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed message");
            return Ok(());
        }
    };

    let outcome = router.route_with(&message, preferences).await?;
    if json {
        match &outcome.notification {
            Some(notification) => println!("{}", serde_json::to_string(notification)?),
            None => println!("{}", serde_json::json!({ "kind": outcome.kind, "stored": false })),
        }
    } else {
        println!("{}", format_outcome(&outcome));
    }
    Ok(())
}

/// 处理 route 命令：路由一条消息，有告警时等到告警结束
pub async fn handle_route(config: Config, args: RouteArgs) -> Result<()> {
    let store = open_store(&config).await?;
    let platform = terminal_platform(args.silent);
    let session = AlarmSession::spawn(platform.clone());
    let router = MessageRouter::new(store, session.clone()).with_surface(platform);

    let preferences = StaticPreferences {
        alarm_enabled: config.alarm_enabled && !args.no_alarm,
        alarm_timeout_secs: args.timeout.unwrap_or(config.alarm_timeout_secs),
    };
    let message = InboundMessage {
        kind: args.kind,
        title: args.title,
        body: args.body,
    };

    let outcome = router.route_with(&message, &preferences).await?;
    println!("{}", format_outcome(&outcome));

    if outcome.escalated() {
        let record = tokio::select! {
            record = session.wait_idle() => record,
            _ = tokio::signal::ctrl_c() => {
                session.stop().await;
                session.wait_idle().await
            }
        };
        if let Some(record) = record {
            println!("{}", format_json(&record));
        }
    }

    session.shutdown().await;
    Ok(())
}
