//! 通知持久化后端
//!
//! `NotificationStore` 只通过 [`StorageBackend`] 访问持久化层。
//! 后端需要保证：
//! - 按时间戳有序读取（新的在前）
//! - 写入与淘汰是一个原子操作，失败时保留写入前的状态
//!
//! 后端接口是同步的，store 会把调用放到 `spawn_blocking` 里执行。

mod jsonl;
mod memory;
mod sqlite;

pub use jsonl::JsonlBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use super::model::{newest_first, NewNotification, Notification, NotificationId, NotificationType};
use crate::error::StorageError;
use serde::{Deserialize, Serialize};

/// 持久化后端 trait
pub trait StorageBackend: Send + Sync + 'static {
    /// 后端名称（用于日志）
    fn name(&self) -> &str;

    /// 读取最新的 `limit` 条记录，新的在前
    fn load(&self, limit: usize) -> Result<Vec<Notification>, StorageError>;

    /// 写入一条记录并淘汰超出 `keep` 的最旧记录
    ///
    /// 未指定 ID 时由后端分配；指定的 ID 已存在时替换原记录。
    fn insert_and_trim(
        &self,
        notification: NewNotification,
        keep: usize,
    ) -> Result<Notification, StorageError>;

    /// 删除全部记录
    fn clear(&self) -> Result<(), StorageError>;
}

/// 带写入序号的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// 写入顺序，用于同一时间戳的排序
    pub seq: u64,
}

impl StoredRecord {
    fn to_notification(&self) -> Notification {
        Notification {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            timestamp: self.timestamp,
            kind: self.kind,
        }
    }
}

/// 内存中的记录集合，Memory 和 JSONL 后端共用
///
/// `records` 始终保持新的在前。
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordLog {
    pub records: Vec<StoredRecord>,
    pub next_id: i64,
    pub next_seq: u64,
}

impl RecordLog {
    pub fn from_records(mut records: Vec<StoredRecord>, next_id: i64, next_seq: u64) -> Self {
        records.sort_by(|a, b| newest_first((a.timestamp, a.seq), (b.timestamp, b.seq)));
        let max_id = records.iter().map(|r| r.id.0).max().unwrap_or(0);
        let max_seq = records.iter().map(|r| r.seq).max().unwrap_or(0);
        Self {
            records,
            next_id: next_id.max(max_id + 1).max(1),
            next_seq: next_seq.max(max_seq + 1).max(1),
        }
    }

    pub fn newest(&self, limit: usize) -> Vec<Notification> {
        self.records
            .iter()
            .take(limit)
            .map(StoredRecord::to_notification)
            .collect()
    }

    /// 插入并淘汰，返回写入的记录和被淘汰的数量
    pub fn insert_and_trim(
        &mut self,
        notification: NewNotification,
        keep: usize,
    ) -> (Notification, usize) {
        let id = match notification.id {
            Some(id) => {
                self.records.retain(|r| r.id != id);
                self.next_id = self.next_id.max(id.0 + 1);
                id
            }
            None => {
                let id = NotificationId(self.next_id);
                self.next_id += 1;
                id
            }
        };
        let seq = self.next_seq;
        self.next_seq += 1;

        let record = StoredRecord {
            id,
            title: notification.title,
            body: notification.body,
            timestamp: notification.timestamp,
            kind: notification.kind,
            seq,
        };
        let stored = record.to_notification();

        let pos = self
            .records
            .iter()
            .position(|r| newest_first((record.timestamp, record.seq), (r.timestamp, r.seq)).is_lt())
            .unwrap_or(self.records.len());
        self.records.insert(pos, record);

        let evicted = self.records.len().saturating_sub(keep);
        self.records.truncate(keep);
        (stored, evicted)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, ts: i64) -> NewNotification {
        NewNotification::new(title, "", NotificationType::Standard).at(ts)
    }

    #[test]
    fn test_record_log_orders_newest_first() {
        let mut log = RecordLog::from_records(Vec::new(), 0, 0);
        log.insert_and_trim(draft("a", 10), 5);
        log.insert_and_trim(draft("c", 30), 5);
        log.insert_and_trim(draft("b", 20), 5);

        let titles: Vec<_> = log.newest(5).into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_record_log_equal_timestamps_evict_earlier_insert() {
        let mut log = RecordLog::from_records(Vec::new(), 0, 0);
        log.insert_and_trim(draft("first", 10), 2);
        log.insert_and_trim(draft("second", 10), 2);
        let (_, evicted) = log.insert_and_trim(draft("third", 10), 2);

        assert_eq!(evicted, 1);
        let titles: Vec<_> = log.newest(5).into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["third", "second"]);
    }

    #[test]
    fn test_record_log_replaces_existing_id() {
        let mut log = RecordLog::from_records(Vec::new(), 0, 0);
        let (first, _) = log.insert_and_trim(draft("old", 10), 5);
        log.insert_and_trim(draft("new", 20).with_id(first.id), 5);

        let all = log.newest(5);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "new");
        assert_eq!(all[0].id, first.id);
    }

    #[test]
    fn test_record_log_ids_survive_clear() {
        let mut log = RecordLog::from_records(Vec::new(), 0, 0);
        let (a, _) = log.insert_and_trim(draft("a", 10), 5);
        log.clear();
        let (b, _) = log.insert_and_trim(draft("b", 20), 5);
        assert!(b.id > a.id);
    }
}
