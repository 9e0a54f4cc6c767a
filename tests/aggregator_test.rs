//! 通知聚合端到端测试
//!
//! 用 JSON fixture 驱动完整流程：打开数据库 → 后台拉取 → 排空事件 → 生成 payload

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dc_notification_service::accounts::fixture::FixtureData;
use dc_notification_service::notification::{CallEventKind, CallReport, CallSink};
use dc_notification_service::{
    AggregateOutcome, CoreAccounts, CoreError, CoreEvent, FixtureCore, NotificationAggregator,
    NotificationContent, NotifyPolicy,
};
use serde_json::json;

// ============================================================================
// 辅助函数
// ============================================================================

/// 两个账户：账户 1 有单聊、静音单聊和群组；账户 2 有一个单聊
fn fixture(events: serde_json::Value) -> serde_json::Value {
    json!({
        "fresh_message_count": 7,
        "accounts": [
            {
                "id": 1,
                "chats": [
                    { "id": 1, "name": "Alice" },
                    { "id": 2, "name": "Noisy Bot", "is_muted": true },
                    { "id": 3, "name": "Climbing", "is_group": true }
                ],
                "contacts": [
                    { "id": 10, "display_name": "Alice" },
                    { "id": 11, "display_name": "Bot" },
                    { "id": 12, "display_name": "Bob" }
                ],
                "messages": [
                    { "id": 1, "chat_id": 1, "from_contact_id": 10, "text": "Are we still on for Friday?" },
                    { "id": 2, "chat_id": 1, "from_contact_id": 10, "text": "Let me know" },
                    { "id": 3, "chat_id": 2, "from_contact_id": 11, "text": "Build passed" },
                    { "id": 4, "chat_id": 3, "from_contact_id": 12, "text": "Gym at 7?" }
                ]
            },
            {
                "id": 2,
                "chats": [ { "id": 9, "name": "Carol" } ],
                "contacts": [ { "id": 20, "display_name": "Carol" } ],
                "messages": [
                    { "id": 1, "chat_id": 9, "from_contact_id": 20, "text": "Standup moved to 10" }
                ]
            }
        ],
        "events": events
    })
}

fn core(value: serde_json::Value) -> FixtureCore {
    FixtureCore::from_json(&value.to_string()).unwrap()
}

fn incoming(account_id: u32, chat_id: u32, msg_id: u32) -> serde_json::Value {
    json!({ "type": "incoming_message", "account_id": account_id, "chat_id": chat_id, "msg_id": msg_id })
}

fn done() -> serde_json::Value {
    json!({ "type": "fetch_done" })
}

fn best_attempt() -> NotificationContent {
    NotificationContent::new("Delta Chat", "You have new messages")
}

fn run(value: serde_json::Value, policy: NotifyPolicy) -> AggregateOutcome {
    let mut aggregator = NotificationAggregator::new(core(value), policy);
    aggregator
        .aggregate(Duration::from_secs(25), &best_attempt())
        .unwrap()
}

// ============================================================================
// 单条 / 汇总
// ============================================================================

mod shape_tests {
    use super::*;

    #[test]
    fn test_single_message() {
        let outcome = run(fixture(json!([incoming(1, 1, 1), done()])), NotifyPolicy::default());
        let content = match outcome {
            AggregateOutcome::Notify(content) => content,
            other => panic!("expected notification, got {:?}", other),
        };
        assert_eq!(content.title.as_deref(), Some("Alice"));
        assert_eq!(content.body.as_deref(), Some("Are we still on for Friday?"));
        assert_eq!(content.badge, Some(7));
    }

    #[test]
    fn test_two_messages_same_chat() {
        let outcome = run(
            fixture(json!([incoming(1, 1, 1), incoming(1, 1, 2), done()])),
            NotifyPolicy::default(),
        );
        let content = outcome.into_content();
        assert_eq!(content.title.as_deref(), Some("Alice"));
        assert_eq!(content.body.as_deref(), Some("2 messages"));
    }

    #[test]
    fn test_two_messages_two_accounts() {
        let outcome = run(
            fixture(json!([incoming(1, 1, 1), incoming(2, 9, 1), done()])),
            NotifyPolicy::default(),
        );
        let content = outcome.into_content();
        assert_eq!(content.body.as_deref(), Some("2 messages in 2 chats"));
        // 标题保留最后一次更新
        assert_eq!(content.title.as_deref(), Some("Carol"));
    }

    #[test]
    fn test_group_title_is_chat_name() {
        let content = run(fixture(json!([incoming(1, 3, 4), done()])), NotifyPolicy::default())
            .into_content();
        assert_eq!(content.title.as_deref(), Some("Climbing"));
        assert_eq!(content.body.as_deref(), Some("Gym at 7?"));
    }

    #[test]
    fn test_override_sender_name_is_plain_title() {
        let mut value = fixture(json!([incoming(1, 1, 2), done()]));
        value["accounts"][0]["messages"][1]["override_sender_name"] = json!("Bridge Bot");
        let content = run(value, NotifyPolicy::default()).into_content();
        assert_eq!(content.title.as_deref(), Some("Bridge Bot"));
        assert_eq!(content.body.as_deref(), Some("Let me know"));
    }

    #[test]
    fn test_duplicate_event_counts_twice() {
        let content = run(
            fixture(json!([incoming(1, 1, 1), incoming(1, 1, 1), done()])),
            NotifyPolicy::default(),
        )
        .into_content();
        assert_eq!(content.body.as_deref(), Some("2 messages"));
    }
}

// ============================================================================
// 过滤
// ============================================================================

mod filter_tests {
    use super::*;

    #[test]
    fn test_muted_chat_is_silent() {
        let outcome = run(fixture(json!([incoming(1, 2, 3), done()])), NotifyPolicy::default());
        assert!(matches!(outcome, AggregateOutcome::Silent(_)));
        assert!(outcome.content().is_silent());
    }

    #[test]
    fn test_muted_chat_does_not_affect_others() {
        let content = run(
            fixture(json!([incoming(1, 2, 3), incoming(1, 1, 1), incoming(1, 2, 3), done()])),
            NotifyPolicy::default(),
        )
        .into_content();
        assert_eq!(content.title.as_deref(), Some("Alice"));
        assert_eq!(content.body.as_deref(), Some("Are we still on for Friday?"));
    }

    #[test]
    fn test_globally_disabled_is_silent() {
        let outcome = run(
            fixture(json!([incoming(1, 1, 1), incoming(2, 9, 1), done()])),
            NotifyPolicy::new(false),
        );
        assert!(matches!(outcome, AggregateOutcome::Silent(_)));
    }

    #[test]
    fn test_muted_account_is_silent() {
        let mut value = fixture(json!([incoming(2, 9, 1), done()]));
        value["accounts"][1]["muted"] = json!(true);
        let outcome = run(value, NotifyPolicy::default());
        assert!(matches!(outcome, AggregateOutcome::Silent(_)));
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let content = run(
            fixture(json!([incoming(5, 1, 1), incoming(1, 1, 42), incoming(2, 9, 1), done()])),
            NotifyPolicy::default(),
        )
        .into_content();
        assert_eq!(content.title.as_deref(), Some("Carol"));
        assert_eq!(content.body.as_deref(), Some("Standup moved to 10"));
    }
}

// ============================================================================
// 拉取失败 / 数据库失败
// ============================================================================

mod failure_tests {
    use super::*;

    #[test]
    fn test_nothing_fetched_passes_through() {
        let mut value = fixture(json!([incoming(1, 1, 1), done()]));
        value["fetch_result"] = json!(false);
        let outcome = run(value, NotifyPolicy::default());
        assert_eq!(outcome, AggregateOutcome::PassThrough(best_attempt()));
    }

    #[test]
    fn test_database_open_failure() {
        let mut value = fixture(json!([incoming(1, 1, 1), done()]));
        value["fail_open"] = json!(true);
        let mut aggregator = NotificationAggregator::new(core(value), NotifyPolicy::default());

        let err = aggregator
            .aggregate(Duration::from_secs(25), &best_attempt())
            .unwrap_err();
        assert!(matches!(err, CoreError::DatabaseOpen(_)));
        assert_eq!(aggregator.accounts().fetch_calls(), 0);
    }

    #[test]
    fn test_stream_without_fetch_done() {
        let outcome = run(fixture(json!([incoming(1, 1, 1)])), NotifyPolicy::default());
        assert_eq!(outcome.content().body.as_deref(), Some("Are we still on for Friday?"));
    }

    #[test]
    fn test_events_after_fetch_done_ignored() {
        let outcome = run(
            fixture(json!([incoming(1, 1, 1), done(), incoming(2, 9, 1)])),
            NotifyPolicy::default(),
        );
        assert_eq!(outcome.content().title.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_database_closed_after_drain() {
        let mut aggregator = NotificationAggregator::new(
            core(fixture(json!([incoming(1, 1, 1), done()]))),
            NotifyPolicy::default(),
        );
        aggregator
            .aggregate(Duration::from_secs(25), &best_attempt())
            .unwrap();
        let core = aggregator.into_accounts();
        assert!(!core.is_open());
        assert_eq!(core.open_calls(), 1);
    }
}

// ============================================================================
// 手动构造的 fixture
// ============================================================================

#[test]
fn test_empty_fixture_is_silent_with_badge() {
    let mut aggregator = NotificationAggregator::new(
        FixtureCore::new(FixtureData {
            events: vec![CoreEvent::FetchDone],
            fresh_message_count: 2,
            ..Default::default()
        }),
        NotifyPolicy::default(),
    );
    let outcome = aggregator
        .aggregate(Duration::from_secs(1), &best_attempt())
        .unwrap();
    assert_eq!(outcome, AggregateOutcome::Silent(NotificationContent::silent().with_badge(2)));
    assert_eq!(aggregator.accounts().fresh_message_count(), 2);
}

// ============================================================================
// 随仓库提供的 fixture 文件
// ============================================================================

struct RecordingCallSink(Mutex<Vec<CallReport>>);

impl CallSink for RecordingCallSink {
    fn report(&self, call: &CallReport) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(call.clone());
        Ok(())
    }
}

#[test]
fn test_bundled_two_accounts_fixture() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/two_accounts.json");
    let core = FixtureCore::from_file(&path).unwrap();
    let sink = Arc::new(RecordingCallSink(Mutex::new(Vec::new())));
    let mut aggregator =
        NotificationAggregator::new(core, NotifyPolicy::default()).with_call_sink(sink.clone());

    let content = aggregator
        .aggregate(Duration::from_secs(25), &best_attempt())
        .unwrap()
        .into_content();

    // 静音群组里回复自己的消息也计入
    assert_eq!(content.body.as_deref(), Some("3 messages in 3 chats"));
    assert_eq!(content.title.as_deref(), Some("Carol"));
    assert_eq!(content.badge, Some(3));
    assert!(content.thread_identifier.is_none());

    let calls = sink.0.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallEventKind::Incoming);
    assert_eq!(calls[0].account_id, 2);
    assert_eq!(calls[0].place_call_info.as_deref(), Some("offer"));
}
