//! Output formatting for CLI commands

use crate::alarm::{AlarmIssue, StartReport};
use crate::notification::{Notification, RouteOutcome};
use serde::Serialize;

/// Format output as JSON
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// 单行展示一条通知
pub fn format_notification(notification: &Notification) -> String {
    format!(
        "#{} [{}] {} {}: {}",
        notification.id,
        notification.kind,
        notification.received_at().format("%Y-%m-%d %H:%M:%S"),
        notification.title,
        notification.body
    )
}

/// 通知列表
pub fn format_history(notifications: &[Notification], json: bool) -> String {
    if json {
        return format_json(&notifications);
    }
    if notifications.is_empty() {
        return "No notifications".to_string();
    }
    notifications
        .iter()
        .map(format_notification)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_issue(issue: &AlarmIssue) -> String {
    match issue {
        AlarmIssue::Resource(e) => format!("degraded to notification only: {}", e),
        AlarmIssue::Permission(e) => format!("best-effort timer: {}", e),
    }
}

fn format_report(report: &StartReport) -> String {
    let mut line = format!("alarm {} sounding", report.session_id);
    if let Some(replaced) = report.replaced {
        line.push_str(&format!(" (replaced {})", replaced));
    }
    for issue in &report.issues {
        line.push_str("; ");
        line.push_str(&format_issue(issue));
    }
    line
}

/// 路由结果
pub fn format_outcome(outcome: &RouteOutcome) -> String {
    let mut lines = Vec::new();
    match (&outcome.notification, &outcome.storage_error) {
        (Some(notification), _) => lines.push(format!("stored {}", format_notification(notification))),
        (None, Some(e)) => lines.push(format!("history not recorded: {}", e)),
        (None, None) => {}
    }
    if let Some(report) = &outcome.alarm {
        lines.push(format_report(report));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotificationId, NotificationType};

    fn sample(id: i64) -> Notification {
        Notification {
            id: NotificationId(id),
            title: "Tank".to_string(),
            body: "Low level".to_string(),
            timestamp: 0,
            kind: NotificationType::Alarm,
        }
    }

    #[test]
    fn test_format_notification_line() {
        let line = format_notification(&sample(3));
        assert!(line.starts_with("#3 [ALARM]"));
        assert!(line.ends_with("Tank: Low level"));
    }

    #[test]
    fn test_format_empty_history() {
        assert_eq!(format_history(&[], false), "No notifications");
        assert_eq!(format_history(&[], true), "[]");
    }

    #[test]
    fn test_format_history_json_uses_type_field() {
        let json = format_history(&[sample(1)], true);
        assert!(json.contains("\"type\": \"ALARM\""));
    }
}
