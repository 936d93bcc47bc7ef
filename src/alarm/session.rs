//! 告警会话 - 单实例状态机（IDLE / SOUNDING）
//!
//! 会话由一个 actor 任务驱动，按到达顺序处理三类事件：
//! `start`、`stop`、`timer_expired(session_id)`。所有状态变更都在 actor 内部完成，
//! 不同线程/任务发来的停止请求和计时器回调天然互斥。
//!
//! ## 资源
//! 音频和计时器在进入 SOUNDING 时获取，归当前会话独占（`ActiveSession`），
//! 在任何离开 SOUNDING 的路径上随 `ActiveSession` 一起 drop 释放：
//! 用户停止、超时、被新告警替换、actor 退出、运行时关闭。
//!
//! ## 过期回调
//! 每次进入 SOUNDING 生成新的 `SessionId`。计时器回调和界面上的停止按钮都带着
//! 生成时的 ID，ID 与当前会话不一致时忽略，旧计时器不会停掉新告警。

use super::platform::{AlarmAlert, AlarmPlatform, AudioLoop, Presentation, SessionId};
use super::timer::{self, TimerMode};
use crate::error::{AlarmError, PermissionDenied, ResourceAcquisitionError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 默认自动停止时间（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const FALLBACK_TITLE: &str = "Alarm title";
const FALLBACK_BODY: &str = "Alarm triggered";

/// 停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// 用户点击停止
    User,
    /// 到达自动停止时间
    Timeout,
    /// 被新告警替换
    Replaced,
    /// 会话关闭
    Teardown,
}

/// 最近一次停止的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopRecord {
    pub session_id: SessionId,
    pub reason: StopReason,
    pub stopped_at: DateTime<Utc>,
}

/// 响铃中的会话信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoundingInfo {
    pub session_id: SessionId,
    pub title: String,
    pub body: String,
    pub started_at: DateTime<Utc>,
    pub timeout: Duration,
    pub presentation: Presentation,
    pub timer: TimerMode,
}

/// 会话状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Idle { last_stop: Option<StopRecord> },
    Sounding(SoundingInfo),
}

impl AlarmState {
    pub fn is_sounding(&self) -> bool {
        matches!(self, AlarmState::Sounding(_))
    }

    /// 正在响铃的会话 ID
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            AlarmState::Sounding(info) => Some(info.session_id),
            AlarmState::Idle { .. } => None,
        }
    }
}

/// 启动过程中遇到的可恢复问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmIssue {
    /// 音频不可用，已退化为仅通知
    Resource(ResourceAcquisitionError),
    /// 没有精确定时权限，已退化为尽力而为计时
    Permission(PermissionDenied),
}

/// `start` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub session_id: SessionId,
    /// 被替换掉的旧会话
    pub replaced: Option<SessionId>,
    pub presentation: Presentation,
    pub timer: TimerMode,
    pub issues: Vec<AlarmIssue>,
}

enum Command {
    Start {
        title: String,
        body: String,
        timeout: Duration,
        reply: oneshot::Sender<StartReport>,
    },
    Stop {
        /// `None` 表示停止当前会话，`Some` 只停止指定会话
        session: Option<SessionId>,
        reason: StopReason,
        reply: Option<oneshot::Sender<bool>>,
    },
    TimerExpired(SessionId),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// 告警界面上的"停止"按钮
///
/// 绑定到创建它的会话；会话已结束或被替换后触发不会有任何效果。
#[derive(Clone)]
pub struct StopAction {
    commands: mpsc::WeakUnboundedSender<Command>,
    session_id: SessionId,
}

impl StopAction {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// 请求停止，返回请求是否送达会话
    pub fn trigger(&self) -> bool {
        match self.commands.upgrade() {
            Some(tx) => tx
                .send(Command::Stop {
                    session: Some(self.session_id),
                    reason: StopReason::User,
                    reply: None,
                })
                .is_ok(),
            None => false,
        }
    }
}

impl std::fmt::Debug for StopAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopAction")
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// 告警会话句柄（可 clone，所有句柄 drop 后会话自动关闭并释放资源）
#[derive(Clone)]
pub struct AlarmSession {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<AlarmState>,
}

impl AlarmSession {
    /// 在当前 tokio 运行时中启动会话 actor
    pub fn spawn(platform: Arc<dyn AlarmPlatform>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(AlarmState::Idle { last_stop: None });

        info!(platform = platform.name(), "Alarm session started");
        let actor = Actor {
            platform,
            commands: tx.downgrade(),
            state: state_tx,
            next_session: 0,
            active: None,
        };
        tokio::spawn(actor.run(rx));

        Self {
            commands: tx,
            state: state_rx,
        }
    }

    /// 开始响铃
    ///
    /// 正在响铃时先停止旧会话（释放音频、取消计时器），再启动新会话。
    /// `timeout_secs` 小于 1 时按 1 秒处理。
    pub async fn start(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<StartReport, AlarmError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start {
                title: title.into(),
                body: body.into(),
                timeout: Duration::from_secs(timeout_secs.max(1)),
                reply,
            })
            .map_err(|_| AlarmError::SessionClosed)?;
        rx.await.map_err(|_| AlarmError::SessionClosed)
    }

    /// 停止当前告警
    ///
    /// 返回是否确实停止了一个响铃中的会话。空闲时（包括会话已关闭）是 no-op。
    pub async fn stop(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        let sent = self.commands.send(Command::Stop {
            session: None,
            reason: StopReason::User,
            reply: Some(reply),
        });
        if sent.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// 关闭会话，正在响铃时先停止
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// 当前状态快照
    pub fn state(&self) -> AlarmState {
        self.state.borrow().clone()
    }

    pub fn is_sounding(&self) -> bool {
        self.state.borrow().is_sounding()
    }

    /// 订阅状态变更
    pub fn subscribe(&self) -> watch::Receiver<AlarmState> {
        self.state.clone()
    }

    /// 等待回到空闲状态，返回停止记录
    pub async fn wait_idle(&self) -> Option<StopRecord> {
        let mut rx = self.state.clone();
        loop {
            if let AlarmState::Idle { last_stop } = &*rx.borrow_and_update() {
                return last_stop.clone();
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

/// 当前会话持有的资源，drop 时全部释放
struct ActiveSession {
    info: SoundingInfo,
    audio: Option<Box<dyn AudioLoop>>,
    timer: JoinHandle<()>,
    platform: Arc<dyn AlarmPlatform>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.timer.abort();
        if let Some(audio) = self.audio.take() {
            audio.stop();
        }
        self.platform.dismiss(self.info.session_id);
    }
}

struct Actor {
    platform: Arc<dyn AlarmPlatform>,
    commands: mpsc::WeakUnboundedSender<Command>,
    state: watch::Sender<AlarmState>,
    next_session: u64,
    active: Option<ActiveSession>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Start {
                    title,
                    body,
                    timeout,
                    reply,
                } => {
                    let report = self.start(title, body, timeout);
                    let _ = reply.send(report);
                }
                Command::Stop {
                    session,
                    reason,
                    reply,
                } => {
                    let stopped = self.stop(session, reason).is_some();
                    if let Some(reply) = reply {
                        let _ = reply.send(stopped);
                    }
                }
                Command::TimerExpired(session_id) => {
                    if self.current_session() == Some(session_id) {
                        self.stop(Some(session_id), StopReason::Timeout);
                    } else {
                        debug!(session_id = %session_id, "Ignoring stale alarm timer");
                    }
                }
                Command::Shutdown { reply } => {
                    self.stop(None, StopReason::Teardown);
                    let _ = reply.send(());
                    break;
                }
            }
        }

        // 所有句柄都已 drop 或收到 shutdown
        self.stop(None, StopReason::Teardown);
        debug!("Alarm session actor exited");
    }

    fn current_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|a| a.info.session_id)
    }

    fn start(&mut self, title: String, body: String, timeout: Duration) -> StartReport {
        // 先释放旧会话，再获取新资源
        let replaced = self.stop(None, StopReason::Replaced);

        self.next_session += 1;
        let session_id = SessionId(self.next_session);
        let alert = AlarmAlert {
            session_id,
            title: if title.is_empty() { FALLBACK_TITLE.to_string() } else { title },
            body: if body.is_empty() { FALLBACK_BODY.to_string() } else { body },
            timeout,
        };
        let mut issues = Vec::new();

        let audio = match self.platform.start_audio(&alert) {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Alarm audio unavailable, falling back to notification only");
                issues.push(AlarmIssue::Resource(e));
                None
            }
        };
        let presentation = if audio.is_some() {
            Presentation::Full
        } else {
            Presentation::NotificationOnly
        };

        let timer_mode = match self.platform.exact_timer_permission() {
            Ok(()) => TimerMode::Precise,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Exact timer not permitted, using best-effort timer");
                issues.push(AlarmIssue::Permission(e));
                TimerMode::BestEffort
            }
        };
        let commands = self.commands.clone();
        let timer = timer::arm(timer_mode, session_id, timeout, move |id| {
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::TimerExpired(id));
            }
        });

        let info = SoundingInfo {
            session_id,
            title: alert.title.clone(),
            body: alert.body.clone(),
            started_at: Utc::now(),
            timeout,
            presentation,
            timer: timer_mode,
        };
        self.active = Some(ActiveSession {
            info: info.clone(),
            audio,
            timer,
            platform: self.platform.clone(),
        });
        self.state.send_replace(AlarmState::Sounding(info));

        let stop = StopAction {
            commands: self.commands.clone(),
            session_id,
        };
        self.platform.present(&alert, presentation, stop);

        info!(
            session_id = %session_id,
            timeout_secs = timeout.as_secs(),
            presentation = ?presentation,
            timer = ?timer_mode,
            replaced = ?replaced,
            "Alarm sounding"
        );

        StartReport {
            session_id,
            replaced,
            presentation,
            timer: timer_mode,
            issues,
        }
    }

    /// 停止会话；`only` 不为空时只停止该会话。返回被停止的会话 ID
    fn stop(&mut self, only: Option<SessionId>, reason: StopReason) -> Option<SessionId> {
        let current = self.current_session()?;
        if only.is_some_and(|id| id != current) {
            debug!(session_id = ?only, current = %current, "Ignoring stop for superseded alarm");
            return None;
        }

        // drop 释放音频、计时器和界面
        let session = self.active.take()?;
        let elapsed = Utc::now() - session.info.started_at;
        drop(session);

        // 替换时不发布中间的空闲状态
        if reason != StopReason::Replaced {
            self.state.send_replace(AlarmState::Idle {
                last_stop: Some(StopRecord {
                    session_id: current,
                    reason,
                    stopped_at: Utc::now(),
                }),
            });
        }

        info!(
            session_id = %current,
            reason = ?reason,
            elapsed_ms = elapsed.num_milliseconds(),
            "Alarm stopped"
        );
        Some(current)
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        // 运行时关闭时 actor 可能来不及跑完，这里兜底释放
        if self.active.take().is_some() {
            warn!("Alarm session dropped while sounding, resources released");
        }
    }
}
