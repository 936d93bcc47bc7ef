//! 告警升级 - 响铃会话和平台适配
//!
//! ```text
//!            start                     stop / timer(session_id) / teardown
//!   IDLE ───────────► SOUNDING ─────────────────────────────────────────► IDLE
//!                       │  ▲
//!                       └──┘ start（先释放旧会话，再启动新会话）
//! ```

pub mod platform;
pub mod session;
pub mod terminal;
pub mod timer;

pub use platform::{AlarmAlert, AlarmPlatform, AudioLoop, NotificationSurface, Presentation, SessionId};
pub use session::{
    AlarmIssue, AlarmSession, AlarmState, SoundingInfo, StartReport, StopAction, StopReason,
    StopRecord, DEFAULT_TIMEOUT_SECS,
};
pub use terminal::TerminalPlatform;
pub use timer::TimerMode;
