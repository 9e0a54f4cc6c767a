//! 核心库事件
//!
//! 事件按发射顺序拉取，`FetchDone` 是显式的终止事件。

use serde::{Deserialize, Serialize};

/// 核心库事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// 新消息
    IncomingMessage {
        account_id: u32,
        chat_id: u32,
        msg_id: u32,
    },
    /// 别人对我的消息做了表情回应
    IncomingReaction {
        account_id: u32,
        contact_id: u32,
        msg_id: u32,
        reaction: String,
    },
    /// webxdc 应用发出的通知
    IncomingWebxdcNotify {
        account_id: u32,
        contact_id: u32,
        msg_id: u32,
        text: String,
    },
    /// 来电
    IncomingCall {
        account_id: u32,
        msg_id: u32,
        place_call_info: String,
    },
    /// 通话结束
    CallEnded { account_id: u32, msg_id: u32 },
    /// 来电已在其他设备接听
    CallAccepted { account_id: u32, msg_id: u32 },
    /// 所有账户的后台拉取完成
    FetchDone,
    /// 通知扩展不关心的其他事件
    Other { id: u32 },
}

impl CoreEvent {
    /// 是否为终止事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoreEvent::FetchDone)
    }

    /// 所属账户（`FetchDone` / `Other` 没有账户）
    pub fn account_id(&self) -> Option<u32> {
        match self {
            CoreEvent::IncomingMessage { account_id, .. }
            | CoreEvent::IncomingReaction { account_id, .. }
            | CoreEvent::IncomingWebxdcNotify { account_id, .. }
            | CoreEvent::IncomingCall { account_id, .. }
            | CoreEvent::CallEnded { account_id, .. }
            | CoreEvent::CallAccepted { account_id, .. } => Some(*account_id),
            CoreEvent::FetchDone | CoreEvent::Other { .. } => None,
        }
    }
}

/// 拉取式事件源
pub trait EventEmitter {
    /// 非阻塞，`None` 表示没有更多已缓冲事件
    fn next_event(&mut self) -> Option<CoreEvent>;
}

/// 事件排空迭代器
///
/// 按发射顺序产出事件，遇到 `FetchDone` 或事件源耗尽时结束，之后不再拉取。
pub struct EventDrain<E> {
    emitter: E,
    finished: bool,
    seen: usize,
}

impl<E: EventEmitter> EventDrain<E> {
    pub fn new(emitter: E) -> Self {
        Self {
            emitter,
            finished: false,
            seen: 0,
        }
    }

    /// 已产出的事件数（不含终止事件）
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// 是否因 `FetchDone` 或耗尽而结束
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<E: EventEmitter> Iterator for EventDrain<E> {
    type Item = CoreEvent;

    fn next(&mut self) -> Option<CoreEvent> {
        if self.finished {
            return None;
        }
        match self.emitter.next_event() {
            Some(event) if !event.is_terminal() => {
                self.seen += 1;
                Some(event)
            }
            _ => {
                self.finished = true;
                None
            }
        }
    }
}

impl<E: EventEmitter + ?Sized> EventEmitter for Box<E> {
    fn next_event(&mut self) -> Option<CoreEvent> {
        (**self).next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct VecEmitter(VecDeque<CoreEvent>);

    impl EventEmitter for VecEmitter {
        fn next_event(&mut self) -> Option<CoreEvent> {
            self.0.pop_front()
        }
    }

    fn incoming(msg_id: u32) -> CoreEvent {
        CoreEvent::IncomingMessage { account_id: 1, chat_id: 10, msg_id }
    }

    #[test]
    fn test_drain_stops_at_fetch_done() {
        let emitter = VecEmitter(VecDeque::from(vec![
            incoming(1),
            incoming(2),
            CoreEvent::FetchDone,
            incoming(3),
        ]));
        let mut drain = EventDrain::new(emitter);
        let events: Vec<_> = drain.by_ref().collect();

        assert_eq!(events, vec![incoming(1), incoming(2)]);
        assert_eq!(drain.seen(), 2);
        assert!(drain.is_finished());
        // 终止后不再拉取
        assert_eq!(drain.next(), None);
    }

    #[test]
    fn test_drain_stops_when_exhausted() {
        let emitter = VecEmitter(VecDeque::from(vec![incoming(1)]));
        let events: Vec<_> = EventDrain::new(emitter).collect();
        assert_eq!(events, vec![incoming(1)]);
    }

    #[test]
    fn test_event_serde_tagged() {
        let json = r#"{"type":"incoming_message","account_id":1,"chat_id":10,"msg_id":7}"#;
        let event: CoreEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, incoming(7));
        assert_eq!(event.account_id(), Some(1));

        let done: CoreEvent = serde_json::from_str(r#"{"type":"fetch_done"}"#).unwrap();
        assert!(done.is_terminal());
        assert_eq!(done.account_id(), None);
    }
}
