//! 历史命令 - recent / count / clear

use super::output::format_history;
use crate::notification::NotificationStore;
use anyhow::Result;

/// 打印最近的通知（新的在前）
pub fn handle_recent(store: &NotificationStore, json: bool) -> Result<()> {
    println!("{}", format_history(&store.recent(), json));
    Ok(())
}

/// 打印通知条数
pub fn handle_count(store: &NotificationStore) -> Result<()> {
    println!("{}", store.count());
    Ok(())
}

/// 清空历史
pub async fn handle_clear(store: &NotificationStore) -> Result<()> {
    let removed = store.count();
    store.clear_all().await?;
    println!("Cleared {} notification(s)", removed);
    Ok(())
}
