//! 推送网关 HTTP 客户端
//!
//! 把 `ProviderMessage` POST 到 `<gateway_url>/messages`，用 `X-Relay-Key` 认证。

use super::message::ProviderMessage;
use crate::config::RelayConfig;
use crate::error::RelayError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// 认证 header
pub const API_KEY_HEADER: &str = "X-Relay-Key";

/// 网关响应
#[derive(Debug, Deserialize)]
pub struct GatewayResponse {
    #[serde(default)]
    pub ok: bool,
    /// 推送服务返回的消息 ID
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// 转发结果，对应转发 API 的响应状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// 204
    Delivered { message_id: Option<String> },
    /// 500
    Failed { error: String },
}

impl RelayOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            RelayOutcome::Delivered { .. } => 204,
            RelayOutcome::Failed { .. } => 500,
        }
    }
}

/// 推送网关客户端
#[derive(Debug)]
pub struct RelayClient {
    client: Client,
    config: RelayConfig,
}

impl RelayClient {
    /// 创建客户端
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        if config.gateway_url.is_empty() {
            return Err(RelayError::InvalidConfig("gateway_url is required".to_string()));
        }
        if config.api_key.is_empty() {
            return Err(RelayError::InvalidConfig("api_key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self { client, config })
    }

    /// 请求地址
    pub fn endpoint(&self) -> String {
        format!("{}/messages", self.config.gateway_url.trim_end_matches('/'))
    }

    /// 发送消息
    pub async fn send(&self, message: &ProviderMessage) -> Result<GatewayResponse, RelayError> {
        info!(
            kind = %message.data.kind,
            topic = %message.topic,
            title = %message.data.title,
            "Sending message to gateway"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Gateway rejected message");
            return Err(RelayError::Gateway(format!("{}: {}", status, body)));
        }

        let gateway_response: GatewayResponse = response.json().await?;
        if gateway_response.ok {
            Ok(gateway_response)
        } else {
            Err(RelayError::Gateway(
                gateway_response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }

    /// 发送并转换为 API 响应语义（失败不返回错误）
    pub async fn relay(&self, message: &ProviderMessage) -> RelayOutcome {
        match self.send(message).await {
            Ok(response) => RelayOutcome::Delivered {
                message_id: response.message_id,
            },
            Err(e) => {
                warn!(error = %e, "Error sending notification");
                RelayOutcome::Failed {
                    error: "Error sending notification".to_string(),
                }
            }
        }
    }
}
