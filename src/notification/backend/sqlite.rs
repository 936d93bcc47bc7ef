//! SQLite 后端
//!
//! 插入和淘汰在同一个事务里完成。schema 版本记录在 `PRAGMA user_version`。

use super::StorageBackend;
use crate::error::StorageError;
use crate::notification::model::{NewNotification, Notification, NotificationId, NotificationType};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/0001_init.sql"),
}];

const SELECT_SQL: &str = "SELECT id, title, body, timestamp, type
FROM notifications
ORDER BY timestamp DESC, seq DESC
LIMIT ?1";

/// 当前程序支持的最新 schema 版本
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// SQLite 后端
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// 打开数据库文件并执行迁移
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let started_at = Instant::now();
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to open notification database");
            StorageError::from(e)
        })?;
        let backend = Self::bootstrap(conn)?;
        info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Opened notification database"
        );
        Ok(backend)
    }

    /// 打开内存数据库
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    /// 默认数据库路径
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("notifications.db")
    }

    fn bootstrap(mut conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StorageError> {
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(StorageError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        debug!(version = migration.version, "Applied notification schema migration");
    }
    tx.commit()?;
    Ok(())
}

fn type_to_db(kind: NotificationType) -> &'static str {
    kind.as_str()
}

fn type_from_db(raw: &str) -> NotificationType {
    match raw {
        "ALARM" => NotificationType::Alarm,
        _ => NotificationType::Standard,
    }
}

fn row_to_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let kind: String = row.get(4)?;
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        title: row.get(1)?,
        body: row.get(2)?,
        timestamp: row.get(3)?,
        kind: type_from_db(&kind),
    })
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self, limit: usize) -> Result<Vec<Notification>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut stmt = conn.prepare_cached(SELECT_SQL)?;
        let rows = stmt.query_map(params![limit as i64], row_to_notification)?;
        let notifications = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    fn insert_and_trim(
        &self,
        notification: NewNotification,
        keep: usize,
    ) -> Result<Notification, StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let tx = conn.transaction()?;

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM notifications",
            [],
            |row| row.get(0),
        )?;
        // id 为 NULL 时由 AUTOINCREMENT 分配；已存在的 id 整行替换
        tx.execute(
            "INSERT OR REPLACE INTO notifications (id, title, body, timestamp, type, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notification.id.map(|id| id.0),
                notification.title.as_str(),
                notification.body.as_str(),
                notification.timestamp,
                type_to_db(notification.kind),
                seq,
            ],
        )?;
        let id = NotificationId(tx.last_insert_rowid());

        let evicted = tx.execute(
            "DELETE FROM notifications WHERE id NOT IN (
                SELECT id FROM notifications ORDER BY timestamp DESC, seq DESC LIMIT ?1
            )",
            params![keep as i64],
        )?;
        tx.commit()?;

        debug!(id = %id, evicted, "Wrote notification row");
        Ok(notification.into_stored(id))
    }

    fn clear(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        conn.execute("DELETE FROM notifications", [])?;
        Ok(())
    }
}

impl SqliteBackend {
    /// 当前 schema 版本（诊断用）
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(title: &str, ts: i64) -> NewNotification {
        NewNotification::new(title, "body", NotificationType::Alarm).at(ts)
    }

    #[test]
    fn test_sqlite_migrations_applied() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(backend.schema_version().unwrap(), latest_version());
    }

    #[test]
    fn test_sqlite_rejects_newer_schema() {
        let dir = TempDir::new().unwrap();
        let path = SqliteBackend::default_path(dir.path());
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        }
        let result = SqliteBackend::open(&path);
        assert!(matches!(
            result,
            Err(StorageError::UnsupportedSchemaVersion { db_version: 99, .. })
        ));
    }

    #[test]
    fn test_sqlite_insert_trim_and_order() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        for i in 0..7 {
            backend.insert_and_trim(draft(&format!("n{}", i), i), 5).unwrap();
        }
        let titles: Vec<_> = backend.load(10).unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["n6", "n5", "n4", "n3", "n2"]);
        assert_eq!(backend.load(10).unwrap()[0].kind, NotificationType::Alarm);
    }

    #[test]
    fn test_sqlite_replace_by_id() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let first = backend.insert_and_trim(draft("old", 1), 5).unwrap();
        let replaced = backend
            .insert_and_trim(draft("new", 2).with_id(first.id), 5)
            .unwrap();

        assert_eq!(replaced.id, first.id);
        let all = backend.load(10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "new");
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = SqliteBackend::default_path(dir.path());
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.insert_and_trim(draft("kept", 1), 5).unwrap();
        }
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.load(5).unwrap()[0].title, "kept");
    }
}
