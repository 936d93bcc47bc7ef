//! 转发请求校验和推送消息构造

use crate::error::RelayError;
use serde::{Deserialize, Serialize};

/// 未提供标题时使用
pub const DEFAULT_TITLE: &str = "Debug Notification";
/// 未提供正文时使用
pub const DEFAULT_BODY: &str = "Please ignore if you are getting this notification";
/// 未提供 topic 时使用
pub const DEFAULT_TOPIC: &str = "debug";

/// 转发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayKind {
    /// 普通通知
    Notifier,
    /// 告警
    Alert,
}

impl RelayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayKind::Notifier => "notifier",
            RelayKind::Alert => "alert",
        }
    }
}

/// 转发请求体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl RelayRequest {
    /// 所有字段都缺失（或为空字符串）
    pub fn is_empty(&self) -> bool {
        [&self.title, &self.body, &self.topic]
            .iter()
            .all(|field| field.as_deref().map_or(true, str::is_empty))
    }
}

/// 推送消息的数据部分，即客户端收到的 `InboundMessage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderData {
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// 发往推送服务的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub data: ProviderData,
    pub topic: String,
}

impl ProviderMessage {
    /// 校验请求并构造消息，空字段使用默认值
    pub fn build(
        request: &RelayRequest,
        kind: RelayKind,
        default_topic: &str,
    ) -> Result<Self, RelayError> {
        if request.is_empty() {
            return Err(RelayError::EmptyRequest);
        }

        let or_default = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let fallback_topic = if default_topic.is_empty() {
            DEFAULT_TOPIC
        } else {
            default_topic
        };

        Ok(Self {
            data: ProviderData {
                title: or_default(&request.title, DEFAULT_TITLE),
                body: or_default(&request.body, DEFAULT_BODY),
                kind: kind.as_str().to_string(),
            },
            topic: or_default(&request.topic, fallback_topic),
        })
    }
}
