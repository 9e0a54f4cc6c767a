//! 通知投递渠道 trait 定义

use anyhow::Result;

use super::content::NotificationContent;

/// 投递结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 投递成功
    Sent,
    /// 跳过
    Skipped(String),
    /// 投递失败
    Failed(String),
}

/// 宿主通知投递渠道
pub trait NotificationSink: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 投递一条 payload
    fn deliver(&self, content: &NotificationContent) -> Result<SendResult>;
}
