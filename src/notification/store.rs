//! 通知存储 - 有容量上限的最近通知记录
//!
//! - 所有写操作串行执行（写锁），淘汰数量总是正确
//! - 写入 + 淘汰由后端原子完成，之后整体替换快照
//! - 读操作返回快照副本，不会看到淘汰到一半的状态
//! - 订阅者在每次变更后收到新的不可变快照

use super::backend::StorageBackend;
use super::model::{NewNotification, Notification};
use crate::error::StorageError;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// 默认保留条数
pub const MAX_RETAINED: usize = 5;

/// 通知快照（新的在前）
pub type NotificationSnapshot = Arc<Vec<Notification>>;

/// 通知存储
pub struct NotificationStore {
    backend: Arc<dyn StorageBackend>,
    capacity: usize,
    /// 串行化写操作
    write_lock: Mutex<()>,
    snapshot: watch::Sender<NotificationSnapshot>,
}

impl NotificationStore {
    /// 打开存储，保留 `MAX_RETAINED` 条
    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, StorageError> {
        Self::with_capacity(backend, MAX_RETAINED).await
    }

    /// 打开存储并指定保留条数（至少 1 条）
    ///
    /// 只加载最新的 `capacity` 条，后端里多出的记录在下一次写入时淘汰。
    pub async fn with_capacity(
        backend: Arc<dyn StorageBackend>,
        capacity: usize,
    ) -> Result<Self, StorageError> {
        let capacity = capacity.max(1);
        let loader = backend.clone();
        let initial = tokio::task::spawn_blocking(move || loader.load(capacity)).await??;
        info!(
            backend = backend.name(),
            capacity,
            loaded = initial.len(),
            "Notification store opened"
        );

        let (snapshot, _) = watch::channel(Arc::new(initial));
        Ok(Self {
            backend,
            capacity,
            write_lock: Mutex::new(()),
            snapshot,
        })
    }

    /// 保留条数
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 后端名称
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// 追加通知
    ///
    /// 分配 ID（如果没有）、按时间戳插入、持久化、淘汰超出容量的最旧记录。
    /// 返回写入的记录；如果它的时间戳比所有保留记录都旧，它会被立即淘汰。
    /// 失败时存储保持追加前的状态。
    pub async fn append(&self, notification: NewNotification) -> Result<Notification, StorageError> {
        self.write(notification, false).await
    }

    /// 追加一条刚收到的通知
    ///
    /// 时间戳不早于已保留的最新记录（时钟回拨或历史来自更晚的时钟时取后者），
    /// 刚收到的通知总排在最前面，不会在写入时被淘汰。
    pub async fn append_received(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StorageError> {
        self.write(notification, true).await
    }

    async fn write(
        &self,
        mut notification: NewNotification,
        received: bool,
    ) -> Result<Notification, StorageError> {
        let _guard = self.write_lock.lock().await;

        let backend = self.backend.clone();
        let capacity = self.capacity;
        let (stored, recent) = tokio::task::spawn_blocking(move || {
            if received {
                if let Some(newest) = backend.load(1)?.first() {
                    if newest.timestamp > notification.timestamp {
                        debug!(
                            now = notification.timestamp,
                            newest = newest.timestamp,
                            "Receipt clock behind retained history, clamping timestamp"
                        );
                        notification.timestamp = newest.timestamp;
                    }
                }
            }
            let stored = backend.insert_and_trim(notification, capacity)?;
            let recent = backend.load(capacity)?;
            Ok::<_, StorageError>((stored, recent))
        })
        .await?
        .map_err(|e| {
            warn!(backend = self.backend.name(), error = %e, "Failed to append notification");
            e
        })?;

        debug!(
            id = %stored.id,
            kind = %stored.kind,
            count = recent.len(),
            "Notification appended"
        );
        self.snapshot.send_replace(Arc::new(recent));
        Ok(stored)
    }

    /// 最近的通知（新的在前，最多 `capacity` 条）
    pub fn recent(&self) -> Vec<Notification> {
        self.snapshot.borrow().as_ref().clone()
    }

    /// 当前条数
    pub fn count(&self) -> usize {
        self.snapshot.borrow().len()
    }

    /// 清空全部记录（幂等）
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.clear()).await??;

        info!(backend = self.backend.name(), "Notification history cleared");
        self.snapshot.send_replace(Arc::new(Vec::new()));
        Ok(())
    }

    /// 订阅变更，每次变更推送一份新快照
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshot.subscribe()
    }
}
