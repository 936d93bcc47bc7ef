//! Tests for the bounded notification store across backends

use push_alarm_relay::notification::{
    JsonlBackend, MemoryBackend, NewNotification, NotificationId, NotificationStore,
    NotificationType, SqliteBackend, StorageBackend, MAX_RETAINED,
};
use std::sync::Arc;
use tempfile::TempDir;

fn standard(title: &str, timestamp: i64) -> NewNotification {
    NewNotification::new(title, "body", NotificationType::Standard).at(timestamp)
}

/// 三种后端，文件后端放在临时目录里
fn backends(dir: &TempDir) -> Vec<Arc<dyn StorageBackend>> {
    vec![
        Arc::new(MemoryBackend::new()),
        Arc::new(JsonlBackend::open(JsonlBackend::default_path(dir.path())).unwrap()),
        Arc::new(SqliteBackend::open(SqliteBackend::default_path(dir.path())).unwrap()),
    ]
}

fn titles(store: &NotificationStore) -> Vec<String> {
    store.recent().into_iter().map(|n| n.title).collect()
}

#[tokio::test]
async fn test_sixth_insert_evicts_oldest() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let name = backend.name().to_string();
        let store = NotificationStore::open(backend).await.unwrap();

        for (i, title) in ["n1", "n2", "n3", "n4", "n5", "n6"].iter().enumerate() {
            store.append(standard(title, i as i64 + 1)).await.unwrap();
        }

        assert_eq!(store.count(), MAX_RETAINED, "backend {}", name);
        assert_eq!(titles(&store), vec!["n6", "n5", "n4", "n3", "n2"], "backend {}", name);
    }
}

#[tokio::test]
async fn test_below_capacity_nothing_evicted() {
    let store = NotificationStore::open(Arc::new(MemoryBackend::new())).await.unwrap();
    store.append(standard("a", 1)).await.unwrap();
    store.append(standard("b", 2)).await.unwrap();
    assert_eq!(titles(&store), vec!["b", "a"]);
}

#[tokio::test]
async fn test_out_of_order_timestamps_sorted_newest_first() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = NotificationStore::open(backend).await.unwrap();
        store.append(standard("middle", 20)).await.unwrap();
        store.append(standard("newest", 30)).await.unwrap();
        store.append(standard("oldest", 10)).await.unwrap();

        assert_eq!(titles(&store), vec!["newest", "middle", "oldest"]);
    }
}

#[tokio::test]
async fn test_older_than_all_retained_is_evicted_immediately() {
    let store = NotificationStore::open(Arc::new(MemoryBackend::new())).await.unwrap();
    for ts in 10..15 {
        store.append(standard(&format!("n{}", ts), ts)).await.unwrap();
    }

    let stale = store.append(standard("ancient", 1)).await.unwrap();
    assert_eq!(stale.title, "ancient");
    assert_eq!(store.count(), MAX_RETAINED);
    assert!(!titles(&store).contains(&"ancient".to_string()));
}

#[tokio::test]
async fn test_equal_timestamps_keep_insertion_order() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = NotificationStore::open(backend).await.unwrap();
        store.append(standard("first", 100)).await.unwrap();
        store.append(standard("second", 100)).await.unwrap();

        // 时间戳相同时，后写入的排在前面
        assert_eq!(titles(&store), vec!["second", "first"]);
    }
}

#[tokio::test]
async fn test_duplicate_content_is_accepted() {
    let store = NotificationStore::open(Arc::new(MemoryBackend::new())).await.unwrap();
    let a = store.append(standard("same", 1)).await.unwrap();
    let b = store.append(standard("same", 1)).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(store.count(), 2);
}

#[tokio::test]
async fn test_caller_supplied_id_replaces_existing() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = NotificationStore::open(backend).await.unwrap();
        let original = store.append(standard("original", 1)).await.unwrap();
        store.append(standard("other", 2)).await.unwrap();

        let updated = store
            .append(standard("updated", 3).with_id(original.id))
            .await
            .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(titles(&store), vec!["updated", "other"]);
    }
}

#[tokio::test]
async fn test_clear_all_is_idempotent() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = NotificationStore::open(backend).await.unwrap();
        store.append(standard("a", 1)).await.unwrap();

        store.clear_all().await.unwrap();
        assert_eq!(store.count(), 0);
        store.clear_all().await.unwrap();
        assert!(store.recent().is_empty());

        // 清空后还能继续写入
        store.append(standard("b", 2)).await.unwrap();
        assert_eq!(titles(&store), vec!["b"]);
    }
}

#[tokio::test]
async fn test_ids_not_reused_after_clear() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = NotificationStore::open(backend).await.unwrap();
        let before = store.append(standard("a", 1)).await.unwrap();
        store.clear_all().await.unwrap();
        let after = store.append(standard("b", 2)).await.unwrap();
        assert!(after.id > before.id);
    }
}

#[tokio::test]
async fn test_concurrent_appends_never_exceed_capacity() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = Arc::new(NotificationStore::open(backend).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(standard(&format!("n{}", i), i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count(), MAX_RETAINED);
        assert_eq!(titles(&store), vec!["n19", "n18", "n17", "n16", "n15"]);
    }
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let jsonl_path = JsonlBackend::default_path(dir.path());
    let sqlite_path = SqliteBackend::default_path(dir.path());

    {
        let jsonl = NotificationStore::open(Arc::new(JsonlBackend::open(&jsonl_path).unwrap()))
            .await
            .unwrap();
        let sqlite = NotificationStore::open(Arc::new(SqliteBackend::open(&sqlite_path).unwrap()))
            .await
            .unwrap();
        for ts in 1..=3 {
            jsonl.append(standard(&format!("j{}", ts), ts)).await.unwrap();
            sqlite.append(standard(&format!("s{}", ts), ts)).await.unwrap();
        }
    }

    let jsonl = NotificationStore::open(Arc::new(JsonlBackend::open(&jsonl_path).unwrap()))
        .await
        .unwrap();
    let sqlite = NotificationStore::open(Arc::new(SqliteBackend::open(&sqlite_path).unwrap()))
        .await
        .unwrap();
    assert_eq!(titles(&jsonl), vec!["j3", "j2", "j1"]);
    assert_eq!(titles(&sqlite), vec!["s3", "s2", "s1"]);
}

#[tokio::test]
async fn test_reopen_with_smaller_capacity_trims_view() {
    let dir = TempDir::new().unwrap();
    let path = JsonlBackend::default_path(dir.path());
    {
        let store = NotificationStore::open(Arc::new(JsonlBackend::open(&path).unwrap()))
            .await
            .unwrap();
        for ts in 1..=5 {
            store.append(standard(&format!("n{}", ts), ts)).await.unwrap();
        }
    }

    let store = NotificationStore::with_capacity(Arc::new(JsonlBackend::open(&path).unwrap()), 2)
        .await
        .unwrap();
    assert_eq!(titles(&store), vec!["n5", "n4"]);
}

#[tokio::test]
async fn test_alarm_type_round_trips_through_storage() {
    let dir = TempDir::new().unwrap();
    for backend in backends(&dir) {
        let store = NotificationStore::open(backend).await.unwrap();
        store
            .append(NewNotification::new("T", "B", NotificationType::Alarm).at(5))
            .await
            .unwrap();
        let recent = store.recent();
        assert_eq!(recent[0].kind, NotificationType::Alarm);
        assert!(recent[0].id > NotificationId(0));
    }
}
