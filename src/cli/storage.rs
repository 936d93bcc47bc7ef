//! 按配置打开通知存储

use crate::config::{Config, StorageKind};
use crate::notification::{
    JsonlBackend, MemoryBackend, NotificationStore, SqliteBackend, StorageBackend,
};
use anyhow::{Context, Result};
use std::sync::Arc;

/// 按配置构造存储后端
pub fn open_backend(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    let data_dir = config.data_dir();
    let backend: Arc<dyn StorageBackend> = match config.storage {
        StorageKind::Jsonl => {
            let path = JsonlBackend::default_path(&data_dir);
            Arc::new(
                JsonlBackend::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
        StorageKind::Sqlite => {
            let path = SqliteBackend::default_path(&data_dir);
            Arc::new(
                SqliteBackend::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
        StorageKind::Memory => Arc::new(MemoryBackend::new()),
    };
    Ok(backend)
}

/// 按配置打开通知存储
pub async fn open_store(config: &Config) -> Result<Arc<NotificationStore>> {
    let backend = open_backend(config)?;
    let store = NotificationStore::with_capacity(backend, config.max_notifications)
        .await
        .context("Failed to load notification history")?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NewNotification, NotificationType};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, storage: StorageKind) -> Config {
        Config {
            storage,
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_open_store_for_each_backend() {
        for kind in [StorageKind::Jsonl, StorageKind::Sqlite, StorageKind::Memory] {
            let dir = TempDir::new().unwrap();
            let store = open_store(&config_in(&dir, kind)).await.unwrap();
            assert_eq!(store.capacity(), 5);
            assert_eq!(store.count(), 0);
        }
    }

    #[tokio::test]
    async fn test_file_backends_share_history_between_opens() {
        for (kind, file) in [
            (StorageKind::Jsonl, "notifications.jsonl"),
            (StorageKind::Sqlite, "notifications.db"),
        ] {
            let dir = TempDir::new().unwrap();
            let config = config_in(&dir, kind);

            let store = open_store(&config).await.unwrap();
            store
                .append(NewNotification::new("t", "b", NotificationType::Standard))
                .await
                .unwrap();
            drop(store);

            assert!(dir.path().join(file).exists());
            let reopened = open_store(&config).await.unwrap();
            assert_eq!(reopened.count(), 1);
        }
    }

    #[tokio::test]
    async fn test_configured_capacity_applies() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, StorageKind::Memory);
        config.max_notifications = 2;
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.capacity(), 2);
    }
}
