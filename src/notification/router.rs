//! 消息路由 - 按类型把收到的推送分发到历史记录和告警会话
//!
//! - 普通通知：写入历史，展示通知
//! - 告警 + 已启用：写入历史，然后开始响铃
//! - 告警 + 未启用：退化为普通通知（只写历史，不响铃）
//!
//! 历史写入总在响铃之前完成，界面看到告警时历史里一定已有对应记录。
//! 历史写入失败只记日志，不阻塞告警。

use super::model::{InboundMessage, NewNotification, Notification, NotificationType};
use super::store::NotificationStore;
use crate::alarm::{AlarmSession, NotificationSurface, StartReport};
use crate::config::Preferences;
use crate::error::{AlarmError, StorageError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 路由结果
#[derive(Debug)]
pub struct RouteOutcome {
    /// 消息分类
    pub kind: NotificationType,
    /// 写入历史的记录（写入失败时为 None）
    pub notification: Option<Notification>,
    /// 历史写入错误
    pub storage_error: Option<StorageError>,
    /// 告警启动结果（没有升级时为 None）
    pub alarm: Option<StartReport>,
}

impl RouteOutcome {
    /// 是否升级为响铃
    pub fn escalated(&self) -> bool {
        self.alarm.is_some()
    }
}

/// 消息路由器
pub struct MessageRouter {
    store: Arc<NotificationStore>,
    alarm: AlarmSession,
    surface: Option<Arc<dyn NotificationSurface>>,
}

impl MessageRouter {
    pub fn new(store: Arc<NotificationStore>, alarm: AlarmSession) -> Self {
        Self {
            store,
            alarm,
            surface: None,
        }
    }

    /// 设置普通通知展示面
    pub fn with_surface(mut self, surface: Arc<dyn NotificationSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn alarm(&self) -> &AlarmSession {
        &self.alarm
    }

    /// 路由一条消息
    ///
    /// 只有告警会话已关闭时返回错误；历史写入失败记录在结果里。
    pub async fn route(
        &self,
        message: &InboundMessage,
        alarm_enabled: bool,
        timeout_secs: u64,
    ) -> Result<RouteOutcome, AlarmError> {
        let kind = message.classify();
        let escalate = kind == NotificationType::Alarm && alarm_enabled;
        debug!(
            raw_type = ?message.kind,
            kind = %kind,
            alarm_enabled,
            escalate,
            "Routing inbound message"
        );

        let mut draft = NewNotification::new(message.title.clone(), message.body.clone(), kind);

        let (notification, storage_error) = match self.store.append_received(draft.clone()).await {
            Ok(stored) => {
                draft.timestamp = stored.timestamp;
                (Some(stored), None)
            }
            Err(e) => {
                warn!(error = %e, kind = %kind, "Failed to record notification history, continuing");
                (None, Some(e))
            }
        };

        let alarm = if escalate {
            let report = self
                .alarm
                .start(message.title.clone(), message.body.clone(), timeout_secs)
                .await?;
            info!(
                session_id = %report.session_id,
                issues = report.issues.len(),
                "Alarm message escalated"
            );
            Some(report)
        } else {
            if kind == NotificationType::Alarm {
                info!("Alarm disabled, recording alarm message as notification only");
            }
            if let Some(surface) = &self.surface {
                surface.post(&draft);
            }
            None
        };

        Ok(RouteOutcome {
            kind,
            notification,
            storage_error,
            alarm,
        })
    }

    /// 按偏好设置路由（每次调用时读取一次最新设置）
    pub async fn route_with(
        &self,
        message: &InboundMessage,
        preferences: &dyn Preferences,
    ) -> Result<RouteOutcome, AlarmError> {
        let current = preferences.snapshot();
        self.route(message, current.alarm_enabled, current.alarm_timeout_secs)
            .await
    }
}
