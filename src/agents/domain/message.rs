//! Thread message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant (agent) message
    Assistant,
    /// System message
    System,
    /// Tool result message
    Tool,
    /// Any role this client does not know about
    #[serde(other)]
    Other,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
            Role::Tool => write!(f, "tool"),
            Role::Other => write!(f, "other"),
        }
    }
}

/// Text payload of a content block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

/// One content block of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    /// Image files, attachments and anything else that is not plain text
    #[serde(other)]
    Other,
}

impl MessageContent {
    /// Create a text block
    pub fn text(value: impl Into<String>) -> Self {
        MessageContent::Text {
            text: TextContent {
                value: value.into(),
                annotations: Vec::new(),
            },
        }
    }

    /// Text value if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(&text.value),
            MessageContent::Other => None,
        }
    }
}

/// A message stored on a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Opaque message id
    pub id: String,
    /// Role of the author
    pub role: Role,
    /// Ordered content blocks
    #[serde(default)]
    pub content: Vec<MessageContent>,
    /// Creation timestamp (Unix epoch seconds)
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Message {
    /// Build a message with a single text block
    pub fn with_text(id: impl Into<String>, role: Role, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: vec![MessageContent::text(value)],
            created_at: None,
        }
    }
}

/// Request body for appending a message to a thread
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
}

impl NewMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One page of a message listing
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePage {
    pub data: Vec<Message>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_content_and_role_are_tolerated() {
        let raw = serde_json::json!({
            "id": "msg_1",
            "role": "narrator",
            "content": [
                { "type": "image_file", "image_file": { "file_id": "f1" } },
                { "type": "text", "text": { "value": "hi", "annotations": [] } }
            ]
        });
        let message: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(message.role, Role::Other);
        assert!(message.content[0].as_text().is_none());
        assert_eq!(message.content[1].as_text(), Some("hi"));
    }
}
