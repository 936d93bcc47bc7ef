//! Push Alarm Relay - 推送通知转发、有上限的通知历史和告警升级

pub mod alarm;
pub mod cli;
pub mod config;
pub mod error;
pub mod notification;
pub mod relay;

pub use alarm::{
    AlarmPlatform, AlarmSession, AlarmState, NotificationSurface, StartReport, StopAction,
    StopReason, TerminalPlatform,
};
pub use config::{Config, FilePreferences, Preferences, StaticPreferences, StorageKind};
pub use error::{AlarmError, PermissionDenied, RelayError, ResourceAcquisitionError, StorageError};
pub use notification::{
    InboundMessage, MessageRouter, Notification, NotificationStore, NotificationType, RouteOutcome,
};
pub use relay::{ProviderMessage, RelayClient, RelayKind, RelayRequest};
