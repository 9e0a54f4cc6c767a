//! 通知聚合器 - 一次后台拉取，排空事件，生成唯一的通知 payload
//!
//! ## 流程
//! 1. 只读打开核心数据库（失败即终止，不做拉取）
//! 2. 有时限的后台拉取；没有拉到数据时原样返回 best-attempt 内容
//! 3. 按发射顺序排空事件，过滤静音，累积计数并覆盖草稿
//! 4. 根据消息数和会话数决定最终形态：静默 / 单条 / 汇总
//!
//! 聚合器自身没有第二层超时，外层硬时限由宿主负责。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::calls::{CallEventKind, CallReport, CallSink, LoggingCallSink};
use super::content::{MessageRef, NotificationContent, NotificationDraft};
use super::formatter::{self, DEFAULT_SUMMARY_CHARS};
use super::policy::{EventKind, NotifyPolicy};
use super::state::{AggregationState, ChatKey};
use crate::accounts::{AccountContext, CoreAccounts, CoreError, CoreEvent, EventDrain};

/// 一条通过过滤的事件
#[derive(Debug, Clone, PartialEq)]
struct Qualified {
    key: ChatKey,
    title: String,
    body: String,
    target: MessageRef,
    relevance_score: f64,
}

/// 一次聚合的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome {
    /// 没有拉到数据，原样转发 best-attempt 内容
    PassThrough(NotificationContent),
    /// 检查过，没有需要提醒的消息
    Silent(NotificationContent),
    /// 单条消息或汇总
    Notify(NotificationContent),
}

impl AggregateOutcome {
    pub fn content(&self) -> &NotificationContent {
        match self {
            AggregateOutcome::PassThrough(c)
            | AggregateOutcome::Silent(c)
            | AggregateOutcome::Notify(c) => c,
        }
    }

    pub fn into_content(self) -> NotificationContent {
        match self {
            AggregateOutcome::PassThrough(c)
            | AggregateOutcome::Silent(c)
            | AggregateOutcome::Notify(c) => c,
        }
    }
}

/// 通知聚合器
pub struct NotificationAggregator<A> {
    accounts: A,
    policy: NotifyPolicy,
    summary_chars: usize,
    call_sink: Arc<dyn CallSink>,
}

impl<A: CoreAccounts> NotificationAggregator<A> {
    /// 创建聚合器，会话管理器显式传入
    pub fn new(accounts: A, policy: NotifyPolicy) -> Self {
        Self {
            accounts,
            policy,
            summary_chars: DEFAULT_SUMMARY_CHARS,
            call_sink: Arc::new(LoggingCallSink),
        }
    }

    /// 设置消息摘要长度
    pub fn with_summary_chars(mut self, summary_chars: usize) -> Self {
        self.summary_chars = summary_chars.max(1);
        self
    }

    /// 设置通话事件接收方
    pub fn with_call_sink(mut self, call_sink: Arc<dyn CallSink>) -> Self {
        self.call_sink = call_sink;
        self
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    pub fn into_accounts(self) -> A {
        self.accounts
    }

    /// 执行一次完整聚合
    ///
    /// 返回 `Err` 仅表示数据库打开失败，此时调用方不应产出任何 payload。
    pub fn aggregate(
        &mut self,
        timeout: Duration,
        best_attempt: &NotificationContent,
    ) -> Result<AggregateOutcome, CoreError> {
        self.accounts.open_database(false)?;
        let emitter = self.accounts.event_emitter();

        if !self.accounts.background_fetch(timeout) {
            warn!(
                timeout_secs = timeout.as_secs_f64(),
                "Background fetch returned nothing, passing through"
            );
            return Ok(AggregateOutcome::PassThrough(best_attempt.clone()));
        }

        let mut drain = EventDrain::new(emitter);
        let (state, draft) = self.drain(&mut drain);
        debug!(events = drain.seen(), "Event stream drained");

        let badge = self.accounts.fresh_message_count();
        self.accounts.close_database();

        info!(
            messages = state.message_count(),
            chats = state.chat_count(),
            badge,
            "Aggregated incoming messages"
        );
        let content = Self::finish(&state, draft).with_badge(badge);
        if state.is_empty() {
            Ok(AggregateOutcome::Silent(content))
        } else {
            Ok(AggregateOutcome::Notify(content))
        }
    }

    /// 排空事件，累积状态和草稿
    ///
    /// 无法解析的事件（账户、会话、消息或联系人不存在）静默跳过。
    pub fn drain<I>(&self, events: I) -> (AggregationState, NotificationDraft)
    where
        I: IntoIterator<Item = CoreEvent>,
    {
        let mut state = AggregationState::new();
        let mut draft = NotificationDraft::new();

        for event in events {
            if event.is_terminal() {
                break;
            }
            if let Some(call) = Self::call_report(&event) {
                if let Err(e) = self.call_sink.report(&call) {
                    warn!(error = %e, "Failed to forward call event");
                }
                continue;
            }
            let Some(qualified) = self.classify(&event) else {
                continue;
            };

            state.record(qualified.key);
            draft.update(qualified.title, qualified.body);
            draft.thread_identifier = Some(qualified.key.to_string());
            draft.target = Some(qualified.target);
            draft.relevance_score = Some(qualified.relevance_score);
        }

        (state, draft)
    }

    /// 根据累积结果决定最终 payload
    pub fn finish(state: &AggregationState, draft: NotificationDraft) -> NotificationContent {
        match (state.message_count(), state.chat_count()) {
            (0, _) => NotificationContent::silent(),
            (1, _) => draft.into_content(),
            (count, 1) => {
                let mut content = draft.into_content();
                content.body = Some(formatter::messages(count));
                content
            }
            (count, chats) => {
                let mut content = draft.into_content();
                content.body = Some(formatter::messages_in_chats(count, chats));
                // 跨会话汇总不指向某一个会话
                content.thread_identifier = None;
                content.target = None;
                content
            }
        }
    }

    fn classify(&self, event: &CoreEvent) -> Option<Qualified> {
        let account_id = event.account_id()?;
        let Some(account) = self.accounts.account(account_id) else {
            debug!(account_id, "Skipping event for unknown account");
            return None;
        };

        let qualified = match event {
            CoreEvent::IncomingMessage { chat_id, msg_id, .. } => {
                self.classify_message(account, *chat_id, *msg_id)
            }
            CoreEvent::IncomingReaction {
                contact_id,
                msg_id,
                reaction,
                ..
            } => {
                let msg = account.message(*msg_id)?;
                let chat = account.chat(msg.chat_id)?;
                if !self.policy.should_notify(account, &chat, &msg, EventKind::Reaction) {
                    return None;
                }
                let contact = account.contact(*contact_id)?;
                let body = formatter::reaction(
                    &contact.display_name,
                    reaction,
                    &msg.summary(self.summary_chars),
                );
                Some(Qualified {
                    key: ChatKey::new(account_id, chat.id),
                    title: chat.name.clone(),
                    body,
                    target: MessageRef { account_id, chat_id: chat.id, msg_id: msg.id },
                    relevance_score: NotifyPolicy::relevance_score(account, &chat, &msg),
                })
            }
            CoreEvent::IncomingWebxdcNotify { msg_id, text, .. } => {
                let msg = account.message(*msg_id)?;
                let chat = account.chat(msg.chat_id)?;
                if !self.policy.should_notify(account, &chat, &msg, EventKind::Webxdc) {
                    return None;
                }
                let app_name = msg.webxdc_app_name.as_deref().unwrap_or_default();
                Some(Qualified {
                    key: ChatKey::new(account_id, chat.id),
                    title: chat.name.clone(),
                    body: formatter::webxdc(app_name, text),
                    target: MessageRef { account_id, chat_id: chat.id, msg_id: msg.id },
                    relevance_score: NotifyPolicy::relevance_score(account, &chat, &msg),
                })
            }
            _ => None,
        };

        if qualified.is_none() {
            debug!(?event, "Event suppressed or unresolved");
        }
        qualified
    }

    fn classify_message(
        &self,
        account: &dyn AccountContext,
        chat_id: u32,
        msg_id: u32,
    ) -> Option<Qualified> {
        let account_id = account.id();
        let chat = account.chat(chat_id)?;
        let msg = account.message(msg_id)?;
        if !self.policy.should_notify(account, &chat, &msg, EventKind::Message) {
            return None;
        }
        let contact = account.contact(msg.from_contact_id)?;

        let title = if chat.is_group {
            chat.name.clone()
        } else {
            msg.sender_name(&contact)
        };
        Some(Qualified {
            key: ChatKey::new(account_id, chat_id),
            title,
            body: msg.summary(self.summary_chars),
            target: MessageRef { account_id, chat_id, msg_id },
            relevance_score: NotifyPolicy::relevance_score(account, &chat, &msg),
        })
    }

    fn call_report(event: &CoreEvent) -> Option<CallReport> {
        let (kind, account_id, msg_id, place_call_info) = match event {
            CoreEvent::IncomingCall {
                account_id,
                msg_id,
                place_call_info,
            } => (CallEventKind::Incoming, *account_id, *msg_id, Some(place_call_info.clone())),
            CoreEvent::CallEnded { account_id, msg_id } => {
                (CallEventKind::Ended, *account_id, *msg_id, None)
            }
            CoreEvent::CallAccepted { account_id, msg_id } => {
                (CallEventKind::Accepted, *account_id, *msg_id, None)
            }
            _ => return None,
        };
        Some(CallReport {
            kind,
            account_id,
            msg_id,
            place_call_info,
        })
    }
}
