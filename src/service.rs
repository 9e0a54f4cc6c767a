//! 通知服务扩展 - 一次推送唤醒的完整处理
//!
//! 互斥检查 → 聚合 → 投递唯一 payload → 记录足迹。
//! 外层硬时限由宿主负责，到期时调用 `ExpiryHandle::time_will_expire`。

use anyhow::Result;
use tracing::{info, warn};

use crate::accounts::CoreAccounts;
use crate::config::ServiceConfig;
use crate::notification::aggregator::{AggregateOutcome, NotificationAggregator};
use crate::notification::channel::SendResult;
use crate::notification::content::NotificationContent;
use crate::notification::dispatcher::NotificationDispatcher;
use crate::notification::guard::FetchGuard;
use crate::notification::policy::NotifyPolicy;
use crate::notification::trail::{code, DebugTrail};

/// 一次唤醒的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceOutcome {
    /// 已有拉取在进行，投递静默通知
    AlreadyFetching,
    /// 已投递聚合结果
    Delivered(AggregateOutcome),
    /// 数据库打开失败，没有产出任何 payload，由宿主兜底
    Aborted(String),
}

impl ServiceOutcome {
    /// 投递出去的 payload
    pub fn delivered_content(&self) -> Option<NotificationContent> {
        match self {
            ServiceOutcome::AlreadyFetching => Some(NotificationContent::silent()),
            ServiceOutcome::Delivered(outcome) => Some(outcome.content().clone()),
            ServiceOutcome::Aborted(_) => None,
        }
    }
}

/// 通知服务
pub struct NotificationService<A> {
    aggregator: NotificationAggregator<A>,
    dispatcher: NotificationDispatcher,
    guard: FetchGuard,
    trail: DebugTrail,
    config: ServiceConfig,
}

impl<A: CoreAccounts> NotificationService<A> {
    pub fn new(accounts: A, dispatcher: NotificationDispatcher, config: ServiceConfig) -> Self {
        let state_dir = config.state_dir();
        let policy = NotifyPolicy::new(config.notifications_enabled);
        let aggregator =
            NotificationAggregator::new(accounts, policy).with_summary_chars(config.summary_chars);
        Self {
            aggregator,
            dispatcher,
            guard: FetchGuard::in_dir(&state_dir),
            trail: DebugTrail::in_dir(&state_dir),
            config,
        }
    }

    /// 替换聚合器（自定义通话接收方等）
    pub fn with_aggregator(mut self, aggregator: NotificationAggregator<A>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn aggregator(&self) -> &NotificationAggregator<A> {
        &self.aggregator
    }

    pub fn trail(&self) -> &DebugTrail {
        &self.trail
    }

    /// 获取到期处理句柄，可在另一个任务中使用
    pub fn expiry_handle(&self) -> ExpiryHandle {
        ExpiryHandle {
            guard: self.guard.clone(),
            trail: self.trail.clone(),
        }
    }

    /// 处理一次推送唤醒
    pub fn did_receive(&mut self, best_attempt: &NotificationContent) -> Result<ServiceOutcome> {
        self.trail.push(code::START, None);

        if self.guard.is_fetching() {
            info!("Another fetch is in progress, delivering silent notification");
            self.trail.push(code::ABORT_NSE_RUNS, None);
            self.deliver(&NotificationContent::silent());
            return Ok(ServiceOutcome::AlreadyFetching);
        }

        if let Err(e) = self.guard.begin(self.config.guard_secs) {
            warn!(error = %e, "Failed to set fetch guard");
        }
        let result = self
            .aggregator
            .aggregate(self.config.fetch_timeout(), best_attempt);
        if let Err(e) = self.guard.done() {
            warn!(error = %e, "Failed to clear fetch guard");
        }

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Core database unavailable, producing no notification");
                self.trail.push(code::ERR_OPEN, Some(e.to_string()));
                return Ok(ServiceOutcome::Aborted(e.to_string()));
            }
        };

        match &outcome {
            AggregateOutcome::PassThrough(_) => self.trail.push(code::ERR_CORE, None),
            AggregateOutcome::Silent(_) => self.trail.push(code::OK_SILENT, None),
            AggregateOutcome::Notify(content) => {
                self.trail.push(code::OK_NOTIFIED, content.body.clone())
            }
        }

        self.deliver(outcome.content());
        Ok(ServiceOutcome::Delivered(outcome))
    }

    fn deliver(&self, content: &NotificationContent) {
        let results = self.dispatcher.deliver(content);
        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, r)| matches!(r, SendResult::Failed(_)))
            .map(|(name, _)| name.as_str())
            .collect();
        if !failed.is_empty() {
            self.trail.push(code::ERR_DELIVER, Some(failed.join(",")));
        }
    }
}

/// 宿主时限到期时的处理句柄
///
/// 不投递任何内容：宿主会使用推送自带的 best-attempt 内容。
#[derive(Debug, Clone)]
pub struct ExpiryHandle {
    guard: FetchGuard,
    trail: DebugTrail,
}

impl ExpiryHandle {
    pub fn time_will_expire(&self) {
        warn!("Service extension time will expire");
        self.trail.push(code::ERR_TIME, None);
        if let Err(e) = self.guard.done() {
            warn!(error = %e, "Failed to clear fetch guard");
        }
    }
}
