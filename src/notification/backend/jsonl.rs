//! JSONL 文件后端
//!
//! 每行一条记录。每次写入都会在独占文件锁下读出全部记录、插入、淘汰，
//! 再写入临时文件并 rename 覆盖，读者只会看到写入前或写入后的完整文件。
//!
//! ID 和写入序号的高水位保存在 `<file>.meta.json`，清空后 ID 也不会复用。

use super::{RecordLog, StorageBackend, StoredRecord};
use crate::error::StorageError;
use crate::notification::model::{NewNotification, Notification};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// ID / 序号高水位
#[derive(Debug, Default, Serialize, Deserialize)]
struct Meta {
    next_id: i64,
    next_seq: u64,
}

/// JSONL 文件后端
#[derive(Debug)]
pub struct JsonlBackend {
    path: PathBuf,
}

impl JsonlBackend {
    /// 打开（不存在时创建目录）
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// 默认存储路径
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("notifications.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn meta_path(&self) -> PathBuf {
        self.path.with_extension("meta.json")
    }

    /// 在独占锁内执行
    fn with_lock<T>(
        &self,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;
        let result = f();
        lock.unlock()?;
        result
    }

    fn read_log(&self) -> Result<RecordLog, StorageError> {
        let records = if self.path.exists() {
            let reader = BufReader::new(File::open(&self.path)?);
            let mut records = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<StoredRecord>(&line) {
                    Ok(record) => records.push(record),
                    // 损坏的行跳过，不影响其他记录
                    Err(e) => warn!(path = %self.path.display(), error = %e, "Skipping malformed notification record"),
                }
            }
            records
        } else {
            Vec::new()
        };

        let meta = self.read_meta();
        Ok(RecordLog::from_records(records, meta.next_id, meta.next_seq))
    }

    fn read_meta(&self) -> Meta {
        fs::read_to_string(self.meta_path())
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn write_log(&self, log: &RecordLog) -> Result<(), StorageError> {
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in &log.records {
                writeln!(temp_file, "{}", serde_json::to_string(record)?)?;
            }
            temp_file.sync_all()?;
        }

        // 原子替换
        fs::rename(&temp_path, &self.path)?;

        let meta = Meta {
            next_id: log.next_id,
            next_seq: log.next_seq,
        };
        // meta 写失败不影响数据；下次读取时会从现有记录推算
        if let Err(e) = fs::write(self.meta_path(), serde_json::to_string(&meta)?) {
            warn!(error = %e, "Failed to persist notification id high-water mark");
        }
        Ok(())
    }
}

impl StorageBackend for JsonlBackend {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn load(&self, limit: usize) -> Result<Vec<Notification>, StorageError> {
        self.with_lock(|| Ok(self.read_log()?.newest(limit)))
    }

    fn insert_and_trim(
        &self,
        notification: NewNotification,
        keep: usize,
    ) -> Result<Notification, StorageError> {
        self.with_lock(|| {
            let mut log = self.read_log()?;
            let (stored, evicted) = log.insert_and_trim(notification, keep);
            self.write_log(&log)?;
            debug!(id = %stored.id, evicted, "Wrote notification record");
            Ok(stored)
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.with_lock(|| {
            let mut log = self.read_log()?;
            log.clear();
            self.write_log(&log)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::model::NotificationType;
    use tempfile::TempDir;

    fn draft(title: &str, ts: i64) -> NewNotification {
        NewNotification::new(title, "body", NotificationType::Standard).at(ts)
    }

    #[test]
    fn test_jsonl_insert_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = JsonlBackend::default_path(dir.path());
        let backend = JsonlBackend::open(&path).unwrap();

        backend.insert_and_trim(draft("a", 1), 5).unwrap();
        backend.insert_and_trim(draft("b", 2), 5).unwrap();

        // 重新打开后数据还在
        let reopened = JsonlBackend::open(&path).unwrap();
        let titles: Vec<_> = reopened.load(5).unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn test_jsonl_trims_file_on_disk() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::open(JsonlBackend::default_path(dir.path())).unwrap();

        for i in 0..8 {
            backend.insert_and_trim(draft(&format!("n{}", i), i), 5).unwrap();
        }

        let content = fs::read_to_string(backend.path()).unwrap();
        assert_eq!(content.lines().count(), 5);
    }

    #[test]
    fn test_jsonl_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = JsonlBackend::default_path(dir.path());
        let backend = JsonlBackend::open(&path).unwrap();
        backend.insert_and_trim(draft("ok", 1), 5).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        let loaded = backend.load(5).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "ok");
    }

    #[test]
    fn test_jsonl_ids_not_reused_after_clear() {
        let dir = TempDir::new().unwrap();
        let path = JsonlBackend::default_path(dir.path());
        let backend = JsonlBackend::open(&path).unwrap();

        let first = backend.insert_and_trim(draft("a", 1), 5).unwrap();
        backend.clear().unwrap();
        assert!(backend.load(5).unwrap().is_empty());

        let reopened = JsonlBackend::open(&path).unwrap();
        let second = reopened.insert_and_trim(draft("b", 2), 5).unwrap();
        assert!(second.id > first.id);
    }
}
