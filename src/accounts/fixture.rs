//! 内存版核心库 - 从 JSON 描述加载账户、会话、消息和事件脚本
//!
//! 供 `dc-nse run --fixture` 和测试使用。`background_fetch` 会把脚本中的事件
//! 放入事件队列，并按 `fetch_result` 返回。

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::{CoreEvent, EventEmitter};
use super::{AccountContext, ChatInfo, ContactInfo, CoreAccounts, CoreError, MessageInfo};

/// fixture 描述文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
    /// 后台拉取产生的事件（按顺序）
    #[serde(default)]
    pub events: Vec<CoreEvent>,
    /// 后台拉取是否拿到了数据
    #[serde(default = "default_true")]
    pub fetch_result: bool,
    /// 模拟拉取耗时；超过 timeout 时视为没有拉到数据
    #[serde(default)]
    pub fetch_delay_ms: u64,
    /// 模拟数据库打开失败
    #[serde(default)]
    pub fail_open: bool,
    #[serde(default)]
    pub fresh_message_count: usize,
}

fn default_true() -> bool {
    true
}

impl Default for FixtureData {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            events: Vec::new(),
            fetch_result: true,
            fetch_delay_ms: 0,
            fail_open: false,
            fresh_message_count: 0,
        }
    }
}

/// fixture 账户
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureAccount {
    pub id: u32,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub mentions_enabled: bool,
    #[serde(default)]
    pub chats: Vec<ChatInfo>,
    #[serde(default)]
    pub messages: Vec<MessageInfo>,
    #[serde(default)]
    pub contacts: Vec<ContactInfo>,
}

impl FixtureAccount {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn mentions_enabled(mut self, enabled: bool) -> Self {
        self.mentions_enabled = enabled;
        self
    }

    pub fn with_chat(mut self, chat: ChatInfo) -> Self {
        self.chats.push(chat);
        self
    }

    pub fn with_message(mut self, message: MessageInfo) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_contact(mut self, contact: ContactInfo) -> Self {
        self.contacts.push(contact);
        self
    }
}

impl AccountContext for FixtureAccount {
    fn id(&self) -> u32 {
        self.id
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn is_mentions_enabled(&self) -> bool {
        self.mentions_enabled
    }

    fn chat(&self, chat_id: u32) -> Option<ChatInfo> {
        self.chats.iter().find(|c| c.id == chat_id).cloned()
    }

    fn message(&self, msg_id: u32) -> Option<MessageInfo> {
        self.messages.iter().find(|m| m.id == msg_id).cloned()
    }

    fn contact(&self, contact_id: u32) -> Option<ContactInfo> {
        self.contacts.iter().find(|c| c.id == contact_id).cloned()
    }
}

/// 内存版多账户会话管理器
pub struct FixtureCore {
    data: FixtureData,
    queue: Arc<Mutex<VecDeque<CoreEvent>>>,
    open: bool,
    open_calls: usize,
    fetch_calls: usize,
}

impl FixtureCore {
    pub fn new(data: FixtureData) -> Self {
        Self {
            data,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            open: false,
            open_calls: 0,
            fetch_calls: 0,
        }
    }

    /// 从 JSON 字符串加载
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let data: FixtureData =
            serde_json::from_str(json).map_err(|e| CoreError::Fixture(e.to_string()))?;
        Ok(Self::new(data))
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// `open_database` 被调用的次数
    pub fn open_calls(&self) -> usize {
        self.open_calls
    }

    /// `background_fetch` 被调用的次数
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl CoreAccounts for FixtureCore {
    fn open_database(&mut self, writeable: bool) -> Result<(), CoreError> {
        self.open_calls += 1;
        if self.data.fail_open {
            return Err(CoreError::DatabaseOpen("fixture configured to fail".to_string()));
        }
        debug!(writeable, "Fixture database opened");
        self.open = true;
        Ok(())
    }

    fn close_database(&mut self) {
        self.open = false;
    }

    fn background_fetch(&mut self, timeout: Duration) -> bool {
        self.fetch_calls += 1;
        if let Ok(mut queue) = self.queue.lock() {
            queue.extend(self.data.events.iter().cloned());
        }

        let delay = Duration::from_millis(self.data.fetch_delay_ms);
        if delay >= timeout {
            std::thread::sleep(timeout);
            return false;
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.data.fetch_result
    }

    fn event_emitter(&self) -> Box<dyn EventEmitter + Send> {
        Box::new(FixtureEmitter {
            queue: Arc::clone(&self.queue),
        })
    }

    fn account(&self, account_id: u32) -> Option<&dyn AccountContext> {
        self.data
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a as &dyn AccountContext)
    }

    fn fresh_message_count(&self) -> usize {
        self.data.fresh_message_count
    }
}

/// 共享 fixture 事件队列的发射器
struct FixtureEmitter {
    queue: Arc<Mutex<VecDeque<CoreEvent>>>,
}

impl EventEmitter for FixtureEmitter {
    fn next_event(&mut self) -> Option<CoreEvent> {
        self.queue.lock().ok()?.pop_front()
    }
}
