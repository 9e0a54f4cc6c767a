//! 聚合状态 - 排空事件时累积的计数

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 会话键：(账户, 会话)
///
/// 显示为 `"{account}-{chat}"`，同时作为通知的 thread identifier。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatKey {
    pub account_id: u32,
    pub chat_id: u32,
}

impl ChatKey {
    pub fn new(account_id: u32, chat_id: u32) -> Self {
        Self { account_id, chat_id }
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.account_id, self.chat_id)
    }
}

/// 聚合状态
///
/// 不变式：`chat_count() <= message_count()`，同一会话可以收到多条消息。
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    message_count: usize,
    unique_chat_keys: HashSet<ChatKey>,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条通过过滤的消息
    ///
    /// 计数器总是递增，集合只按会话去重。
    pub fn record(&mut self, key: ChatKey) {
        self.message_count += 1;
        self.unique_chat_keys.insert(key);
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// 涉及的不同会话数
    pub fn chat_count(&self) -> usize {
        self.unique_chat_keys.len()
    }

    pub fn contains(&self, key: &ChatKey) -> bool {
        self.unique_chat_keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }
}
