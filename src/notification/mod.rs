//! 通知层 - 从核心事件到宿主通知中心
//!
//! # 组成
//! 1. `NotificationAggregator`：拉取、排空事件、过滤静音、生成唯一 payload
//! 2. `NotifyPolicy`：全局 / 账户 / 会话三级静音
//! 3. `NotificationDispatcher`：把 payload 交给所有 `NotificationSink`
//! 4. `FetchGuard` / `DebugTrail`：跨进程互斥和事后排查足迹
//!
//! # 使用示例
//! ```ignore
//! use dc_notification_service::notification::{NotificationAggregator, NotifyPolicy, NotificationContent};
//!
//! let mut aggregator = NotificationAggregator::new(accounts, NotifyPolicy::default());
//! let outcome = aggregator.aggregate(Duration::from_secs(25), &NotificationContent::silent())?;
//! ```

pub mod aggregator;
pub mod calls;
pub mod channel;
pub mod channels;
pub mod content;
pub mod dispatcher;
pub mod formatter;
pub mod guard;
pub mod policy;
pub mod state;
pub mod trail;

pub use aggregator::{AggregateOutcome, NotificationAggregator};
pub use calls::{CallEventKind, CallReport, CallSink, LoggingCallSink};
pub use channel::{NotificationSink, SendResult};
pub use channels::{LocalFileSink, StdoutSink};
pub use content::{MessageRef, NotificationContent, NotificationDraft};
pub use dispatcher::NotificationDispatcher;
pub use guard::FetchGuard;
pub use policy::{EventKind, NotifyPolicy};
pub use state::{AggregationState, ChatKey};
pub use trail::{DebugTrail, TrailEntry};
