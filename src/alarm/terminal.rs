//! 终端平台 - CLI 使用的告警适配
//!
//! 音频用终端响铃（BEL）循环模拟，告警界面打印到 stderr。
//! 最近一次展示的停止按钮保存在平台里，`press_stop` 相当于用户点击了停止。

use super::platform::{AlarmAlert, AlarmPlatform, AudioLoop, NotificationSurface, Presentation, SessionId};
use super::session::StopAction;
use crate::error::ResourceAcquisitionError;
use crate::notification::NewNotification;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// 响铃间隔
const BELL_INTERVAL: Duration = Duration::from_secs(2);

/// 终端响铃循环
struct TerminalBell {
    task: JoinHandle<()>,
}

impl AudioLoop for TerminalBell {
    fn stop(self: Box<Self>) {
        self.task.abort();
    }
}

/// 终端平台
pub struct TerminalPlatform {
    /// 是否真正响铃（stderr 不是终端时关闭）
    bell: bool,
    /// 是否在前台（stdin 不是终端时无法在告警界面上交互）
    foreground: bool,
    stop_action: Mutex<Option<StopAction>>,
}

impl TerminalPlatform {
    pub fn new() -> Self {
        Self {
            bell: std::io::stderr().is_terminal(),
            foreground: std::io::stdin().is_terminal(),
            stop_action: Mutex::new(None),
        }
    }

    /// 关闭响铃（音频获取会失败，会话退化为仅通知）
    pub fn without_bell(mut self) -> Self {
        self.bell = false;
        self
    }

    /// 以后台方式运行（音频获取因无法前台执行而失败）
    pub fn in_background(mut self) -> Self {
        self.foreground = false;
        self
    }

    /// 点击当前告警的停止按钮，没有告警时返回 false
    pub fn press_stop(&self) -> bool {
        let action = self
            .stop_action
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        match action {
            Some(action) => action.trigger(),
            None => false,
        }
    }
}

impl Default for TerminalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmPlatform for TerminalPlatform {
    fn name(&self) -> &str {
        "terminal"
    }

    fn start_audio(&self, alert: &AlarmAlert) -> Result<Box<dyn AudioLoop>, ResourceAcquisitionError> {
        if !self.bell {
            return Err(ResourceAcquisitionError::AudioUnavailable(
                "stderr is not a terminal".to_string(),
            ));
        }
        if !self.foreground {
            return Err(ResourceAcquisitionError::ForegroundDenied(
                "stdin is not a terminal".to_string(),
            ));
        }

        debug!(session_id = %alert.session_id, "Starting terminal bell loop");
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(BELL_INTERVAL);
            loop {
                ticks.tick().await;
                let mut stderr = std::io::stderr();
                let _ = stderr.write_all(b"\x07");
                let _ = stderr.flush();
            }
        });
        Ok(Box::new(TerminalBell { task }))
    }

    fn present(&self, alert: &AlarmAlert, presentation: Presentation, stop: StopAction) {
        let mode = match presentation {
            Presentation::Full => "",
            Presentation::NotificationOnly => " (silent)",
        };
        eprintln!();
        eprintln!("🚨 ALARM{} [{}]", mode, alert.session_id);
        eprintln!("   {}", alert.title);
        eprintln!("   {}", alert.body);
        eprintln!(
            "   Auto-stops in {}s. Type `stop` and press Enter to silence.",
            alert.timeout.as_secs()
        );

        if let Ok(mut guard) = self.stop_action.lock() {
            *guard = Some(stop);
        }
    }

    fn dismiss(&self, session_id: SessionId) {
        if let Ok(mut guard) = self.stop_action.lock() {
            if guard.as_ref().is_some_and(|a| a.session_id() == session_id) {
                *guard = None;
            }
        }
        eprintln!("🔕 Alarm {} stopped", session_id);
    }
}

impl NotificationSurface for TerminalPlatform {
    fn post(&self, notification: &NewNotification) {
        eprintln!(
            "🔔 [{}] {}: {}",
            notification.received_at().format("%H:%M:%S"),
            notification.title,
            notification.body
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmIssue, AlarmSession};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_background_terminal_reports_foreground_denied() {
        let platform = Arc::new(TerminalPlatform {
            bell: true,
            foreground: false,
            stop_action: Mutex::new(None),
        });
        let session = AlarmSession::spawn(platform.clone());

        let report = session.start("T", "B", 5).await.unwrap();
        assert_eq!(report.presentation, Presentation::NotificationOnly);
        assert!(matches!(
            report.issues.as_slice(),
            [AlarmIssue::Resource(ResourceAcquisitionError::ForegroundDenied(_))]
        ));

        // 停止按钮仍然可用
        assert!(platform.press_stop());
        let record = session.wait_idle().await.unwrap();
        assert_eq!(record.reason, crate::alarm::StopReason::User);
    }

    #[tokio::test]
    async fn test_background_without_bell_reports_audio_first() {
        let platform = TerminalPlatform::new().without_bell().in_background();
        let alert = AlarmAlert {
            session_id: SessionId(1),
            title: "T".to_string(),
            body: "B".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            platform.start_audio(&alert),
            Err(ResourceAcquisitionError::AudioUnavailable(_))
        ));
    }
}
