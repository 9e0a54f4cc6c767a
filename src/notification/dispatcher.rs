//! 通知分发器 - 把唯一的 payload 交给所有已注册渠道

use super::channel::{NotificationSink, SendResult};
use super::content::NotificationContent;
use std::sync::Arc;
use tracing::{info, warn};

/// 通知分发器
pub struct NotificationDispatcher {
    /// 所有注册的渠道
    sinks: Vec<Arc<dyn NotificationSink>>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册渠道
    pub fn register_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        info!(sink = sink.name(), "Registering notification sink");
        self.sinks.push(sink);
    }

    /// 投递到所有渠道，单个渠道失败不影响其他渠道
    pub fn deliver(&self, content: &NotificationContent) -> Vec<(String, SendResult)> {
        let mut results = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let name = sink.name().to_string();

            if self.dry_run {
                eprintln!("[DRY-RUN] Would deliver to sink: {}", name);
                results.push((name, SendResult::Skipped("dry-run".to_string())));
                continue;
            }

            let result = match sink.deliver(content) {
                Ok(r) => r,
                Err(e) => {
                    warn!(sink = %name, error = %e, "Sink delivery failed");
                    SendResult::Failed(e.to_string())
                }
            };
            results.push((name, result));
        }

        results
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
