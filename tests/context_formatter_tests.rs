use chrono::Utc;
use trialogue::client_wrapper::{Message, Role};
use trialogue::context_formatter::{format_history, label_content};
use trialogue::message_record::{MessageRecord, TurnRole};

#[test]
fn test_empty_history_formats_empty() {
    assert!(format_history(&[]).is_empty());
}

#[test]
fn test_human_turns_pass_through_unlabelled() {
    let formatted = format_history(&[MessageRecord::human("[CLAUDE]: not really claude")]);
    assert_eq!(
        formatted,
        vec![Message::new(Role::User, "[CLAUDE]: not really claude")]
    );
}

#[test]
fn test_agent_turns_are_labelled_by_speaker() {
    let history = vec![
        MessageRecord::human("Hi everyone!"),
        MessageRecord::agent("claude", "Hello."),
        MessageRecord::agent("deepseek", "Greetings."),
        MessageRecord::human("Thoughts?"),
    ];

    assert_eq!(
        format_history(&history),
        vec![
            Message::new(Role::User, "Hi everyone!"),
            Message::new(Role::Assistant, "[CLAUDE]: Hello."),
            Message::new(Role::Assistant, "[DEEPSEEK]: Greetings."),
            Message::new(Role::User, "Thoughts?"),
        ]
    );
}

#[test]
fn test_any_registered_speaker_is_labelled() {
    let record = MessageRecord::with_timestamp(TurnRole::Agent, "mistral", "Bonjour", Utc::now());
    let formatted = format_history(&[record]);
    assert_eq!(formatted[0].role, Role::Assistant);
    assert_eq!(&*formatted[0].content, "[MISTRAL]: Bonjour");
}

#[test]
fn test_notices_are_never_replayed() {
    let history = vec![
        MessageRecord::human("Hello"),
        MessageRecord::notice("Error: Unable to get response from Claude. timed out"),
        MessageRecord::agent("deepseek", "Hi"),
    ];
    let formatted = format_history(&history);
    assert_eq!(formatted.len(), 2);
    assert_eq!(&*formatted[1].content, "[DEEPSEEK]: Hi");
}

#[test]
fn test_label_preserves_content_verbatim() {
    assert_eq!(
        label_content("claude", "line one\n\nline two"),
        "[CLAUDE]: line one\n\nline two"
    );
}
