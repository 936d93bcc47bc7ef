//! 通知历史 - 有上限的最近通知记录和消息路由
//!
//! # 数据流
//! ```text
//! 推送消息 ─► MessageRouter ─┬─► NotificationStore.append（新的在前，超出上限淘汰最旧）
//!                            └─► AlarmSession.start（告警且已启用）
//! ```
//!
//! # 使用示例
//! ```ignore
//! use push_alarm_relay::notification::{MemoryBackend, NotificationStore, MessageRouter, InboundMessage};
//!
//! let store = Arc::new(NotificationStore::open(Arc::new(MemoryBackend::new())).await?);
//! let router = MessageRouter::new(store.clone(), alarm);
//! router.route(&InboundMessage::new("alert", "T", "B"), true, 60).await?;
//! ```

pub mod backend;
pub mod model;
pub mod router;
pub mod store;

pub use backend::{JsonlBackend, MemoryBackend, SqliteBackend, StorageBackend};
pub use model::{InboundMessage, NewNotification, Notification, NotificationId, NotificationType};
pub use router::{MessageRouter, RouteOutcome};
pub use store::{NotificationSnapshot, NotificationStore, MAX_RETAINED};
