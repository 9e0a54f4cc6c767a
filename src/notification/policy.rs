//! 通知过滤策略 - 全局开关、账户静音、会话静音

use crate::accounts::{AccountContext, ChatInfo, ChatVisibility, MessageInfo};

/// 触发通知的事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Reaction,
    Webxdc,
}

/// 通知过滤策略
#[derive(Debug, Clone, Copy)]
pub struct NotifyPolicy {
    notifications_enabled: bool,
}

impl NotifyPolicy {
    pub fn new(notifications_enabled: bool) -> Self {
        Self { notifications_enabled }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// 判断事件是否应该产生通知
    ///
    /// # 规则
    /// - 全局关闭通知：一律不通知
    /// - 账户静音：一律不通知
    /// - 会话未静音：通知
    /// - 会话静音：仅当群组 + 账户开启提及通知，且（回应/webxdc 事件，或消息回复了自己）时通知
    pub fn should_notify(
        &self,
        account: &dyn AccountContext,
        chat: &ChatInfo,
        msg: &MessageInfo,
        kind: EventKind,
    ) -> bool {
        if !self.notifications_enabled || account.is_muted() {
            return false;
        }
        if !chat.is_muted {
            return true;
        }
        chat.is_group
            && account.is_mentions_enabled()
            && (kind != EventKind::Message || msg.is_reply_to_self)
    }

    /// 通知排序权重
    pub fn relevance_score(
        account: &dyn AccountContext,
        chat: &ChatInfo,
        msg: &MessageInfo,
    ) -> f64 {
        if chat.visibility == ChatVisibility::Pinned {
            0.9
        } else if chat.is_group && account.is_mentions_enabled() && msg.is_reply_to_self {
            0.8
        } else if chat.is_muted {
            0.0
        } else if chat.is_group {
            0.3
        } else {
            0.5
        }
    }
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
