//! 通知文案 - 单条消息、回应、webxdc 通知和多条消息的汇总正文

/// 默认消息摘要长度（字符）
pub const DEFAULT_SUMMARY_CHARS: usize = 80;

/// 通知文案常量
pub mod msg {
    pub const MESSAGE_ONE: &str = "message";
    pub const MESSAGE_OTHER: &str = "messages";
    pub const CHAT_ONE: &str = "chat";
    pub const CHAT_OTHER: &str = "chats";
}

fn plural(n: usize, one: &str, other: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { other })
}

/// "N messages"
pub fn messages(count: usize) -> String {
    plural(count, msg::MESSAGE_ONE, msg::MESSAGE_OTHER)
}

/// "N messages in M chats"
pub fn messages_in_chats(count: usize, chats: usize) -> String {
    format!(
        "{} in {}",
        messages(count),
        plural(chats, msg::CHAT_ONE, msg::CHAT_OTHER)
    )
}

/// 回应通知正文
pub fn reaction(contact: &str, reaction: &str, summary: &str) -> String {
    format!("{} reacted {} to \"{}\"", contact, reaction, summary)
}

/// webxdc 通知正文
pub fn webxdc(app_name: &str, text: &str) -> String {
    if app_name.is_empty() {
        text.to_string()
    } else {
        format!("{}: {}", app_name, text)
    }
}
