//! 标准输出渠道 - 每条 payload 输出一行 JSON

use anyhow::Result;
use std::io::{self, Write};

use crate::notification::channel::{NotificationSink, SendResult};
use crate::notification::content::NotificationContent;

pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn deliver(&self, content: &NotificationContent) -> Result<SendResult> {
        let line = serde_json::to_string(content)?;
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(SendResult::Sent)
    }
}
