use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use trialogue::conversation_store::ConversationStore;
use trialogue::message_record::{MessageRecord, TurnRole};

#[test]
fn test_unknown_conversation_reads_empty() {
    let store = ConversationStore::new();
    assert!(store.get("missing").is_empty());
    assert_eq!(store.history_len("missing"), 0);
    assert_eq!(store.count(), 0);
}

#[test]
fn test_append_creates_and_orders() {
    let store = ConversationStore::new();
    store.append("c1", MessageRecord::human("first"));
    store.append("c1", MessageRecord::agent("claude", "second"));
    store.append("c1", MessageRecord::agent("deepseek", "third"));

    let history = store.get("c1");
    let contents: Vec<&str> = history.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert_eq!(history[0].role, TurnRole::Human);
    assert_eq!(store.count(), 1);
    assert_eq!(store.ids(), vec!["c1".to_string()]);
}

#[test]
fn test_append_clamps_backwards_timestamp() {
    let store = ConversationStore::new();
    let now = Utc::now();
    store.append(
        "c1",
        MessageRecord::with_timestamp(TurnRole::Human, "human", "later", now),
    );
    let stored = store.append(
        "c1",
        MessageRecord::with_timestamp(
            TurnRole::Agent,
            "claude",
            "earlier",
            now - ChronoDuration::seconds(30),
        ),
    );

    assert_eq!(stored.timestamp, now);
    assert_eq!(store.get("c1")[1].timestamp, now);
}

#[test]
fn test_delete_is_idempotent() {
    let store = ConversationStore::new();
    store.append("c1", MessageRecord::human("hello"));
    assert!(store.delete("c1"));
    assert!(!store.delete("c1"));
    assert!(!store.delete("never-existed"));
    assert!(store.get("c1").is_empty());
    assert_eq!(store.count(), 0);
}

#[test]
fn test_replace_swaps_whole_history() {
    let store = ConversationStore::new();
    store.append("c1", MessageRecord::human("old"));
    store.replace(
        "c1",
        vec![
            MessageRecord::human("restored"),
            MessageRecord::agent("deepseek", "restored reply"),
        ],
    );
    let history = store.get("c1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "restored");
}

#[test]
fn test_evict_idle_keeps_recent_conversations() {
    let store = ConversationStore::new();
    store.append("stale", MessageRecord::human("hello"));
    std::thread::sleep(Duration::from_millis(50));
    store.append("fresh", MessageRecord::human("hello"));

    assert_eq!(store.evict_idle(Duration::from_millis(30)), 1);
    assert_eq!(store.ids(), vec!["fresh".to_string()]);
}

#[test]
fn test_remove_if_idle_rechecks_activity() {
    let store = ConversationStore::new();
    store.append("c1", MessageRecord::human("hello"));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(store.idle_ids(Duration::from_millis(30)), vec!["c1".to_string()]);

    // Activity between listing and removal keeps the conversation.
    store.append("c1", MessageRecord::human("still here"));
    assert!(!store.remove_if_idle("c1", Duration::from_millis(30)));
    assert_eq!(store.history_len("c1"), 2);

    std::thread::sleep(Duration::from_millis(50));
    assert!(store.remove_if_idle("c1", Duration::from_millis(30)));
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn test_concurrent_appends_are_not_lost() {
    let store = Arc::new(ConversationStore::new());
    let mut handles = Vec::new();
    for task in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                store.append("shared", MessageRecord::human(format!("{}-{}", task, i)));
                store.append(&format!("own-{}", task), MessageRecord::human("x"));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.history_len("shared"), 200);
    assert_eq!(store.count(), 9);
    let history = store.get("shared");
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
