//! 内存后端（测试和 `storage = "memory"` 使用，进程退出即丢失）

use super::{RecordLog, StorageBackend};
use crate::error::StorageError;
use crate::notification::model::{NewNotification, Notification};
use std::sync::Mutex;

/// 内存后端
#[derive(Debug)]
pub struct MemoryBackend {
    log: Mutex<RecordLog>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(RecordLog::from_records(Vec::new(), 0, 0)),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, limit: usize) -> Result<Vec<Notification>, StorageError> {
        let log = self.log.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(log.newest(limit))
    }

    fn insert_and_trim(
        &self,
        notification: NewNotification,
        keep: usize,
    ) -> Result<Notification, StorageError> {
        let mut log = self.log.lock().map_err(|_| StorageError::LockPoisoned)?;
        let (stored, _) = log.insert_and_trim(notification, keep);
        Ok(stored)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.log
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }
}
