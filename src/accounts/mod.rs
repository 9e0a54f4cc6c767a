//! 核心库协作者接口
//!
//! 消息存储、传输和加密都由外部核心库完成，这里只定义通知扩展需要的最小接口：
//! - `CoreAccounts`：多账户会话管理器（打开数据库、后台拉取）
//! - `EventEmitter`：拉取式事件源
//! - `AccountContext`：单个账户（会话、消息、联系人查询）
//!
//! 会话管理器通过参数显式传入，不使用进程级单例，便于用 mock 测试。

pub mod event;
pub mod fixture;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use event::{CoreEvent, EventDrain, EventEmitter};
pub use fixture::FixtureCore;

/// 核心库错误
#[derive(Error, Debug)]
pub enum CoreError {
    /// 数据库打开失败（致命，整个流程终止）
    #[error("failed to open core database: {0}")]
    DatabaseOpen(String),

    /// fixture 加载失败
    #[error("invalid fixture: {0}")]
    Fixture(String),
}

/// 多账户会话管理器
pub trait CoreAccounts {
    /// 打开数据库，幂等
    fn open_database(&mut self, writeable: bool) -> Result<(), CoreError>;

    /// 关闭数据库
    fn close_database(&mut self);

    /// 对所有账户执行一次有时限的后台拉取
    ///
    /// 返回 `false` 表示没有拉取到任何数据（网络不可达、超时等）
    fn background_fetch(&mut self, timeout: Duration) -> bool;

    /// 获取事件发射器，与会话管理器相互独立
    fn event_emitter(&self) -> Box<dyn EventEmitter + Send>;

    /// 按 id 获取账户
    fn account(&self, account_id: u32) -> Option<&dyn AccountContext>;

    /// 所有账户的未读消息总数（用于角标）
    fn fresh_message_count(&self) -> usize;
}

/// 单个账户
pub trait AccountContext {
    fn id(&self) -> u32;

    /// 账户级静音
    fn is_muted(&self) -> bool;

    /// 静音群组中被提及时是否仍然通知
    fn is_mentions_enabled(&self) -> bool;

    fn chat(&self, chat_id: u32) -> Option<ChatInfo>;

    fn message(&self, msg_id: u32) -> Option<MessageInfo>;

    fn contact(&self, contact_id: u32) -> Option<ContactInfo>;
}

/// 会话可见性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatVisibility {
    #[default]
    Normal,
    Archived,
    Pinned,
}

/// 会话信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub visibility: ChatVisibility,
}

/// 消息信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: u32,
    pub chat_id: u32,
    pub from_contact_id: u32,
    #[serde(default)]
    pub text: String,
    /// 发送方覆盖的显示名（机器人、桥接账户等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_sender_name: Option<String>,
    /// 是否回复了自己发的消息（群组提及）
    #[serde(default)]
    pub is_reply_to_self: bool,
    /// webxdc 应用名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webxdc_app_name: Option<String>,
}

impl MessageInfo {
    /// 截断后的消息摘要，按字符计数，超出时以 `…` 结尾
    pub fn summary(&self, max_chars: usize) -> String {
        let text = self.text.trim();
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }

    /// 发送方显示名：优先使用覆盖名，通知中不加 `~` 标记
    pub fn sender_name(&self, contact: &ContactInfo) -> String {
        match &self.override_sender_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => contact.display_name.clone(),
        }
    }
}

/// 联系人信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub id: u32,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> MessageInfo {
        MessageInfo {
            id: 1,
            chat_id: 10,
            from_contact_id: 5,
            text: text.to_string(),
            override_sender_name: None,
            is_reply_to_self: false,
            webxdc_app_name: None,
        }
    }

    #[test]
    fn test_summary_short_text_unchanged() {
        assert_eq!(message("  hello ").summary(80), "hello");
    }

    #[test]
    fn test_summary_truncates_by_chars() {
        let msg = message("日本語のメッセージです");
        let summary = msg.summary(5);
        assert_eq!(summary.chars().count(), 5);
        assert_eq!(summary, "日本語の…");
    }

    #[test]
    fn test_sender_name_prefers_override() {
        let contact = ContactInfo { id: 5, display_name: "Alice".to_string() };
        let mut msg = message("hi");
        assert_eq!(msg.sender_name(&contact), "Alice");

        msg.override_sender_name = Some("Bridge Bot".to_string());
        assert_eq!(msg.sender_name(&contact), "Bridge Bot");

        msg.override_sender_name = Some(String::new());
        assert_eq!(msg.sender_name(&contact), "Alice");
    }
}
