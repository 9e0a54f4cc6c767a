//! 通话事件转发
//!
//! 通话事件不计入消息通知，而是转交给宿主的 VoIP 通道。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// 通话事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEventKind {
    Incoming,
    Ended,
    Accepted,
}

/// 转发给宿主的通话事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallReport {
    pub kind: CallEventKind,
    pub account_id: u32,
    pub msg_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_call_info: Option<String>,
}

/// 通话事件接收方
pub trait CallSink: Send + Sync {
    fn report(&self, call: &CallReport) -> Result<()>;
}

/// 只记录日志的默认实现
#[derive(Debug, Default)]
pub struct LoggingCallSink;

impl CallSink for LoggingCallSink {
    fn report(&self, call: &CallReport) -> Result<()> {
        info!(
            kind = ?call.kind,
            account_id = call.account_id,
            msg_id = call.msg_id,
            "Call event forwarded"
        );
        Ok(())
    }
}
