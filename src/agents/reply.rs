//! Picks the reply out of a thread listing

use crate::agents::domain::{Message, Role};

/// Text returned to the caller when the agent produced nothing usable
pub const NO_RESPONSE: &str = "No response from agent";

/// Text of the most recent assistant message.
///
/// `messages` must be newest first. Only the final content block of that
/// message counts; if it is not text there is no reply.
pub fn latest_assistant_reply(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .find(|message| message.role == Role::Assistant)
        .and_then(|message| message.content.last())
        .and_then(|block| block.as_text())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::MessageContent;

    #[test]
    fn test_no_assistant_message() {
        let messages = vec![Message::with_text("msg_1", Role::User, "List my files")];
        assert_eq!(latest_assistant_reply(&messages), None);
        assert_eq!(latest_assistant_reply(&[]), None);
    }

    #[test]
    fn test_single_assistant_message() {
        let messages = vec![
            Message::with_text("msg_2", Role::Assistant, "You have no files."),
            Message::with_text("msg_1", Role::User, "List my files"),
        ];
        assert_eq!(
            latest_assistant_reply(&messages).as_deref(),
            Some("You have no files.")
        );
    }

    #[test]
    fn test_newest_assistant_message_wins() {
        let messages = vec![
            Message::with_text("msg_3", Role::Assistant, "second"),
            Message::with_text("msg_2", Role::Assistant, "first"),
        ];
        assert_eq!(latest_assistant_reply(&messages).as_deref(), Some("second"));
    }

    #[test]
    fn test_final_block_decides() {
        let mut message = Message::with_text("msg_2", Role::Assistant, "intro");
        message.content.push(MessageContent::text("final"));
        assert_eq!(latest_assistant_reply(&[message.clone()]).as_deref(), Some("final"));

        message.content.push(MessageContent::Other);
        assert_eq!(latest_assistant_reply(&[message]), None);
    }
}
