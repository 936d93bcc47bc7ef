//! 配置和偏好设置
//!
//! 配置文件 `~/.config/push-alarm-relay/config.json`（JSON），缺失的字段使用默认值：
//!
//! ```json
//! {
//!   "alarm_enabled": true,
//!   "alarm_timeout_secs": 60,
//!   "max_notifications": 5,
//!   "storage": "jsonl",
//!   "relay": { "gateway_url": "http://localhost:4444", "api_key": "..." }
//! }
//! ```

use crate::alarm::DEFAULT_TIMEOUT_SECS;
use crate::notification::MAX_RETAINED;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "push-alarm-relay";

/// 偏好设置（告警开关和自动停止时间）
///
/// 对核心逻辑只读；修改只影响下一次 `start`。
pub trait Preferences: Send + Sync {
    fn alarm_enabled(&self) -> bool;
    fn alarm_timeout_secs(&self) -> u64;

    /// 一次性读取两项设置，保证来自同一份配置
    fn snapshot(&self) -> StaticPreferences {
        StaticPreferences {
            alarm_enabled: self.alarm_enabled(),
            alarm_timeout_secs: self.alarm_timeout_secs(),
        }
    }
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Jsonl,
    Sqlite,
    Memory,
}

/// 转发配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 推送网关地址
    pub gateway_url: String,
    /// 网关 API key
    pub api_key: String,
    /// 未指定 topic 时使用
    pub default_topic: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:4444".to_string(),
            api_key: String::new(),
            default_topic: "debug".to_string(),
            timeout_secs: 30,
        }
    }
}

/// 配置文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alarm_enabled: bool,
    pub alarm_timeout_secs: u64,
    pub max_notifications: usize,
    pub storage: StorageKind,
    /// 存储目录，默认 `~/.config/push-alarm-relay`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub relay: RelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alarm_enabled: true,
            alarm_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_notifications: MAX_RETAINED,
            storage: StorageKind::default(),
            data_dir: None,
            relay: RelayConfig::default(),
        }
    }
}

impl Config {
    /// 默认配置目录
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    /// 默认配置文件路径
    pub fn path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// 从默认路径加载，文件不存在时返回默认配置
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// 从指定路径加载
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config.normalized())
    }

    /// 写入配置
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 修正越界的值
    fn normalized(mut self) -> Self {
        if self.alarm_timeout_secs == 0 {
            warn!("alarm_timeout_secs must be at least 1, using 1");
            self.alarm_timeout_secs = 1;
        }
        if self.max_notifications == 0 {
            warn!("max_notifications must be at least 1, using 1");
            self.max_notifications = 1;
        }
        self
    }

    /// 存储目录
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::config_dir)
    }
}

impl Preferences for Config {
    fn alarm_enabled(&self) -> bool {
        self.alarm_enabled
    }

    fn alarm_timeout_secs(&self) -> u64 {
        self.alarm_timeout_secs.max(1)
    }
}

/// 每次读取时重新加载配置文件的偏好设置
///
/// 长时间运行的 `listen` 使用，修改配置文件后下一条告警即生效。
/// 读取失败时保留上一次成功读取的值。
pub struct FilePreferences {
    path: PathBuf,
    fallback: std::sync::Mutex<Config>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>, initial: Config) -> Self {
        Self {
            path: path.into(),
            fallback: std::sync::Mutex::new(initial),
        }
    }

    fn current(&self) -> Config {
        match Config::load_from(&self.path) {
            Ok(config) => {
                if let Ok(mut guard) = self.fallback.lock() {
                    *guard = config.clone();
                }
                config
            }
            Err(e) => {
                warn!(error = %e, "Failed to reload preferences, keeping previous values");
                self.fallback
                    .lock()
                    .map(|guard| guard.clone())
                    .unwrap_or_default()
            }
        }
    }
}

impl Preferences for FilePreferences {
    fn alarm_enabled(&self) -> bool {
        self.current().alarm_enabled
    }

    fn alarm_timeout_secs(&self) -> u64 {
        self.current().alarm_timeout_secs()
    }

    fn snapshot(&self) -> StaticPreferences {
        let config = self.current();
        StaticPreferences {
            alarm_enabled: config.alarm_enabled,
            alarm_timeout_secs: config.alarm_timeout_secs(),
        }
    }
}

/// 固定值的偏好设置（测试和命令行覆盖使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPreferences {
    pub alarm_enabled: bool,
    pub alarm_timeout_secs: u64,
}

impl Preferences for StaticPreferences {
    fn alarm_enabled(&self) -> bool {
        self.alarm_enabled
    }

    fn alarm_timeout_secs(&self) -> u64 {
        self.alarm_timeout_secs.max(1)
    }
}
