//! Turns a conversation's history into the flat role/content context a backend consumes.
//!
//! Chat APIs only know two conversational roles, so a transcript holding turns from more than
//! one agent would be ambiguous on the wire. Every non-human turn is therefore labelled with
//! its speaker:
//!
//! ```text
//! human    "Hi everyone!"      ->  user       "Hi everyone!"
//! claude   "Hello there."      ->  assistant  "[CLAUDE]: Hello there."
//! deepseek "Greetings."        ->  assistant  "[DEEPSEEK]: Greetings."
//! ```
//!
//! The callee's own earlier turns are labelled the same way as everybody else's.
//! Placing the roles on the wire is left to each [`ClientWrapper`](crate::ClientWrapper).

use crate::client_wrapper::{Message, Role};
use crate::message_record::MessageRecord;

/// `"[SPEAKER]: content"`.
pub fn label_content(speaker: &str, content: &str) -> String {
    format!("[{}]: {}", speaker.to_uppercase(), content)
}

/// Format a whole history, preserving order. Notices are skipped.
pub fn format_history(history: &[MessageRecord]) -> Vec<Message> {
    history
        .iter()
        .filter(|record| !record.is_notice())
        .map(|record| {
            if record.is_human() {
                Message::new(Role::User, record.content.as_str())
            } else {
                Message::new(
                    Role::Assistant,
                    label_content(&record.speaker, &record.content),
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_uppercases_speaker() {
        assert_eq!(label_content("deepseek", "hi"), "[DEEPSEEK]: hi");
        assert_eq!(label_content("Claude", ""), "[CLAUDE]: ");
    }
}
