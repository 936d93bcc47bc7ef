//! 告警自动停止计时器

use super::platform::SessionId;
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// 尽力而为模式的检查间隔
const BEST_EFFORT_TICK: Duration = Duration::from_secs(1);

/// 计时模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// 到点即触发
    Precise,
    /// 每秒检查一次，可能晚到最多一个间隔
    BestEffort,
}

/// 启动一次性倒计时，到期后以会话 ID 调用 `on_expire`
///
/// 返回的 handle 被 abort 后回调不会执行；已经发出的回调由会话按 ID 过滤。
pub(crate) fn arm<F>(mode: TimerMode, session_id: SessionId, timeout: Duration, on_expire: F) -> JoinHandle<()>
where
    F: FnOnce(SessionId) + Send + 'static,
{
    tokio::spawn(async move {
        match mode {
            TimerMode::Precise => sleep(timeout).await,
            TimerMode::BestEffort => {
                let armed_at = Instant::now();
                // 超出时钟范围的超时视为永不到期
                let Some(deadline) = armed_at.checked_add(timeout) else {
                    std::future::pending::<()>().await;
                    return;
                };
                let mut ticks = interval_at(armed_at + BEST_EFFORT_TICK, BEST_EFFORT_TICK);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticks.tick().await;
                    if Instant::now() >= deadline {
                        break;
                    }
                }
            }
        }
        on_expire(session_id);
    })
}
