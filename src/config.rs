//! 服务配置 - `~/.config/dc-notification-service/config.json`
//!
//! 文件不存在时使用默认值。`DC_NSE_NOTIFICATIONS=0` 可全局关闭通知。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::notification::formatter::DEFAULT_SUMMARY_CHARS;

pub const DEFAULT_FETCH_TIMEOUT_SECS: f64 = 25.0;
const MAX_FETCH_TIMEOUT_SECS: f64 = 600.0;
/// 比拉取时限多一秒
pub const DEFAULT_GUARD_SECS: i64 = 26;
pub const NOTIFICATIONS_ENV: &str = "DC_NSE_NOTIFICATIONS";

const APP_DIR: &str = "dc-notification-service";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// 全局通知开关
    pub notifications_enabled: bool,
    /// 后台拉取时限（秒）
    pub fetch_timeout_secs: f64,
    /// 拉取互斥的过期时间（秒）
    pub guard_secs: i64,
    /// 消息摘要长度（字符）
    pub summary_chars: usize,
    /// 状态目录（互斥文件、调试足迹）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            guard_secs: DEFAULT_GUARD_SECS,
            summary_chars: DEFAULT_SUMMARY_CHARS,
            state_dir: None,
        }
    }
}

impl ServiceConfig {
    /// 默认配置目录
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    /// 从默认位置加载，并应用环境变量覆盖
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_dir().join("config.json"))?;
        config.apply_env(std::env::var(NOTIFICATIONS_ENV).ok().as_deref());
        Ok(config)
    }

    /// 从指定文件加载，文件不存在时返回默认值
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// 应用 `DC_NSE_NOTIFICATIONS` 覆盖
    pub fn apply_env(&mut self, value: Option<&str>) {
        match value.map(str::trim) {
            Some("0") | Some("false") | Some("off") => self.notifications_enabled = false,
            Some("1") | Some("true") | Some("on") => self.notifications_enabled = true,
            _ => {}
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fetch_timeout_secs.max(0.0).min(MAX_FETCH_TIMEOUT_SECS))
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(Self::config_dir)
    }
}
