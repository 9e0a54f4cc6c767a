//! Delta Chat 通知服务扩展 - 推送唤醒后拉取多账户消息并生成一条通知

pub mod accounts;
pub mod config;
pub mod notification;
pub mod service;

pub use accounts::{
    AccountContext, CoreAccounts, CoreError, CoreEvent, EventDrain, EventEmitter, FixtureCore,
};
pub use config::ServiceConfig;
pub use notification::{
    AggregateOutcome, AggregationState, ChatKey, NotificationAggregator, NotificationContent,
    NotificationDispatcher, NotificationDraft, NotifyPolicy,
};
pub use service::{ExpiryHandle, NotificationService, ServiceOutcome};
