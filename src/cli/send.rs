//! Send 命令 - 通过推送网关转发通知或告警

use super::output::format_json;
use crate::config::RelayConfig;
use crate::relay::{ProviderMessage, RelayClient, RelayKind, RelayOutcome, RelayRequest};
use anyhow::{anyhow, Result};
use clap::Args;

/// Send 命令参数
#[derive(Args, Debug)]
pub struct SendArgs {
    /// 作为告警发送（客户端会响铃）
    #[arg(long)]
    pub alert: bool,

    /// 标题
    #[arg(long)]
    pub title: Option<String>,

    /// 正文
    #[arg(long)]
    pub body: Option<String>,

    /// 推送 topic
    #[arg(long)]
    pub topic: Option<String>,

    /// 只打印将要发送的消息
    #[arg(long)]
    pub dry_run: bool,
}

impl SendArgs {
    fn kind(&self) -> RelayKind {
        if self.alert {
            RelayKind::Alert
        } else {
            RelayKind::Notifier
        }
    }

    fn request(&self) -> RelayRequest {
        RelayRequest {
            title: self.title.clone(),
            body: self.body.clone(),
            topic: self.topic.clone(),
        }
    }
}

/// 处理 send 命令
pub async fn handle_send(relay: RelayConfig, args: SendArgs) -> Result<()> {
    let message = ProviderMessage::build(&args.request(), args.kind(), &relay.default_topic)?;

    if args.dry_run {
        println!("{}", format_json(&message));
        return Ok(());
    }

    let client = RelayClient::new(relay)?;
    match client.relay(&message).await {
        RelayOutcome::Delivered { message_id } => {
            println!(
                "Sent {} to topic {}{}",
                message.data.kind,
                message.topic,
                message_id.map(|id| format!(" ({})", id)).unwrap_or_default()
            );
            Ok(())
        }
        RelayOutcome::Failed { error } => Err(anyhow!(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_to_request() {
        let args = SendArgs {
            alert: true,
            title: Some("T".to_string()),
            body: None,
            topic: None,
            dry_run: true,
        };
        assert_eq!(args.kind(), RelayKind::Alert);
        assert_eq!(args.request().title.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_empty_send_is_rejected_before_network() {
        let args = SendArgs {
            alert: false,
            title: None,
            body: None,
            topic: None,
            dry_run: false,
        };
        let err = handle_send(RelayConfig::default(), args).await.unwrap_err();
        assert!(err.to_string().contains("no request body"));
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_api_key() {
        let args = SendArgs {
            alert: false,
            title: Some("T".to_string()),
            body: None,
            topic: None,
            dry_run: true,
        };
        assert!(handle_send(RelayConfig::default(), args).await.is_ok());
    }
}
