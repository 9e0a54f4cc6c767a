//! 通知内容 - 交给宿主通知中心的最终 payload，以及排空过程中的草稿

use serde::{Deserialize, Serialize};

/// 通知指向的消息（点击通知后跳转用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub account_id: u32,
    pub chat_id: u32,
    pub msg_id: u32,
}

/// 通知 payload
///
/// `title` 和 `body` 都为空表示静默通知：宿主不显示任何提醒，
/// 区别于“无法检查”时原样转发的 best-attempt 内容。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// 角标数字
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<usize>,
    /// 同一会话的通知分组键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<MessageRef>,
    /// 0.0 - 1.0，通知摘要中的排序权重
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl NotificationContent {
    /// 创建带标题和正文的通知
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    /// 静默通知
    pub fn silent() -> Self {
        Self::default()
    }

    /// 设置角标
    pub fn with_badge(mut self, badge: usize) -> Self {
        self.badge = Some(badge);
        self
    }

    /// 是否为静默通知
    pub fn is_silent(&self) -> bool {
        self.title.as_deref().map_or(true, str::is_empty)
            && self.body.as_deref().map_or(true, str::is_empty)
    }
}

/// 通知草稿
///
/// 每次唤醒新建一个；每条通过过滤的事件都会覆盖标题和正文，
/// 只有恰好一条消息时才原样使用。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    pub thread_identifier: Option<String>,
    pub target: Option<MessageRef>,
    pub relevance_score: Option<f64>,
}

impl NotificationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用最新一条事件覆盖草稿
    pub fn update(&mut self, title: String, body: String) {
        self.title = title;
        self.body = body;
    }

    pub fn into_content(self) -> NotificationContent {
        NotificationContent {
            title: Some(self.title),
            body: Some(self.body),
            badge: None,
            thread_identifier: self.thread_identifier,
            target: self.target,
            relevance_score: self.relevance_score,
        }
    }
}
