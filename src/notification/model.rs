//! 通知数据模型

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 通知 ID（持久化时分配，不透明）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// 普通通知，只记录历史
    Standard,
    /// 告警，触发响铃
    Alarm,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Standard => "STANDARD",
            NotificationType::Alarm => "ALARM",
        }
    }

    /// 解析消息中的 type 字段
    ///
    /// 大小写不敏感。`alarm` / `alert` 视为告警，其余（包括缺失）一律按普通通知处理。
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("alarm") | Some("alert") => NotificationType::Alarm,
            _ => NotificationType::Standard,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 已持久化的通知（创建后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    /// 接收时间（epoch 毫秒）
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

impl Notification {
    /// 接收时间
    pub fn received_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }
}

/// 待写入的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// 调用方指定的 ID；已存在时替换原记录
    pub id: Option<NotificationId>,
    pub title: String,
    pub body: String,
    pub timestamp: i64,
    pub kind: NotificationType,
}

impl NewNotification {
    /// 以当前时间创建
    pub fn new(title: impl Into<String>, body: impl Into<String>, kind: NotificationType) -> Self {
        Self {
            id: None,
            title: title.into(),
            body: body.into(),
            timestamp: Utc::now().timestamp_millis(),
            kind,
        }
    }

    /// 设置时间戳
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 指定 ID
    pub fn with_id(mut self, id: NotificationId) -> Self {
        self.id = Some(id);
        self
    }

    /// 接收时间
    pub fn received_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }

    /// 落盘后补上 ID
    pub fn into_stored(self, id: NotificationId) -> Notification {
        Notification {
            id,
            title: self.title,
            body: self.body,
            timestamp: self.timestamp,
            kind: self.kind,
        }
    }
}

/// 推送渠道投递过来的原始消息
///
/// 形如 `{"type": "alert", "title": "...", "body": "..."}`，字段都可能缺失。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl InboundMessage {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn classify(&self) -> NotificationType {
        NotificationType::classify(self.kind.as_deref())
    }
}

/// 排序键：时间戳降序，同一时间戳按写入顺序降序（后写入的在前）
pub(crate) fn newest_first(a: (i64, u64), b: (i64, u64)) -> std::cmp::Ordering {
    b.0.cmp(&a.0).then(b.1.cmp(&a.1))
}
