//! 错误类型
//!
//! 存储、告警资源、平台权限、告警会话、转发各自一类错误，
//! 库内部全部使用带类型的错误，CLI 层统一转为 `anyhow::Error`。

use thiserror::Error;

/// 持久化层错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 文件读写失败
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    /// 记录序列化/反序列化失败
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// SQLite 错误
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// 数据库 schema 版本比当前程序新
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },
    /// 后端内部锁被污染（持锁线程 panic）
    #[error("storage backend lock poisoned")]
    LockPoisoned,
    /// 后台 I/O 任务异常退出
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// 告警音频/前台资源获取失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceAcquisitionError {
    /// 无法获取音频输出（设备占用、音频焦点被拒等）
    #[error("audio output unavailable: {0}")]
    AudioUnavailable(String),
    /// 平台拒绝前台执行
    #[error("foreground execution denied: {0}")]
    ForegroundDenied(String),
}

/// 平台未授予某项权限（目前只有精确定时器）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("permission denied: {permission}")]
pub struct PermissionDenied {
    pub permission: String,
}

impl PermissionDenied {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

/// 告警会话错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlarmError {
    /// 会话 actor 已退出
    #[error("alarm session is closed")]
    SessionClosed,
}

/// 转发（relay）错误
#[derive(Debug, Error)]
pub enum RelayError {
    /// 请求体为空
    #[error("no request body")]
    EmptyRequest,
    /// 配置缺失或非法
    #[error("invalid relay config: {0}")]
    InvalidConfig(String),
    /// HTTP 请求失败
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// 网关返回失败
    #[error("gateway rejected message: {0}")]
    Gateway(String),
}

impl RelayError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::EmptyRequest => 400,
            RelayError::InvalidConfig(_) | RelayError::Http(_) | RelayError::Gateway(_) => 500,
        }
    }
}
