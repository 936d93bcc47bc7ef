//! 平台适配层 trait
//!
//! 告警会话本身不关心音频怎么播、界面怎么画，只通过这里的 trait 调用平台：
//! - 获取/释放循环播放的音频
//! - 展示/撤销带"停止"按钮的告警界面
//! - 查询精确定时权限

use super::session::StopAction;
use crate::error::{PermissionDenied, ResourceAcquisitionError};
use crate::notification::NewNotification;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// 告警会话 ID，每次进入响铃状态时生成
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alarm-{}", self.0)
    }
}

/// 交给平台展示的告警内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmAlert {
    pub session_id: SessionId,
    pub title: String,
    pub body: String,
    /// 自动停止时间
    pub timeout: Duration,
}

/// 告警展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// 声音 + 告警界面
    Full,
    /// 音频不可用，只展示告警界面
    NotificationOnly,
}

/// 正在循环播放的告警音频
///
/// 由会话独占，`stop` 会停止播放并释放底层资源。
pub trait AudioLoop: Send {
    fn stop(self: Box<Self>);
}

/// 告警平台 trait
pub trait AlarmPlatform: Send + Sync + 'static {
    /// 平台名称（用于日志）
    fn name(&self) -> &str;

    /// 以告警音量开始循环播放
    fn start_audio(&self, alert: &AlarmAlert) -> Result<Box<dyn AudioLoop>, ResourceAcquisitionError>;

    /// 展示告警，`stop` 供用户点击停止
    fn present(&self, alert: &AlarmAlert, presentation: Presentation, stop: StopAction);

    /// 撤销告警界面
    fn dismiss(&self, session_id: SessionId);

    /// 是否允许精确定时；拒绝时会话退化为尽力而为的计时
    fn exact_timer_permission(&self) -> Result<(), PermissionDenied> {
        Ok(())
    }
}

/// 普通通知的展示面（系统通知栏等）
///
/// 传入的是收到的原始通知，历史记录写入失败时也会展示。
pub trait NotificationSurface: Send + Sync {
    fn post(&self, notification: &NewNotification);
}
