//! Conversation transcript: messages, snapshots and the stream reducer.

pub mod reducer;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use reducer::{Applied, DropReason, TranscriptReducer};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::ToolCall => write!(f, "tool_call"),
            Role::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// Message content - either plain text or a structured JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Value),
}

impl MessageContent {
    /// Returns the text, or `None` for structured content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Structured(_) => None,
        }
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            reasoning: None,
        }
    }

    /// Creates an empty assistant message ready to receive deltas.
    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(String::new()),
            reasoning: None,
        }
    }

    /// Creates a tool call message; `args` is omitted from the content when absent.
    pub fn tool_call(name: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            role: Role::ToolCall,
            content: MessageContent::Structured(named_object(name.into(), "args", args)),
            reasoning: None,
        }
    }

    /// Creates a tool result message; `result` is omitted from the content when absent.
    pub fn tool_result(name: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            role: Role::ToolResult,
            content: MessageContent::Structured(named_object(name.into(), "result", result)),
            reasoning: None,
        }
    }

    /// Returns the text content, or an empty string for structured content.
    pub fn text(&self) -> &str {
        self.content.as_text().unwrap_or_default()
    }
}

fn named_object(name: String, key: &str, value: Option<Value>) -> Value {
    let mut object = Map::new();
    object.insert("name".to_string(), Value::String(name));
    if let Some(value) = value {
        object.insert(key.to_string(), value);
    }
    Value::Object(object)
}

/// Immutable view of the transcript at one revision.
///
/// Cloning is cheap: the message list is shared until the reducer writes again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptSnapshot {
    /// Incremented on every published mutation.
    pub revision: u64,
    pub messages: Arc<Vec<Arc<Message>>>,
    /// Index of the message open for append, if any.
    pub open: Option<usize>,
}

impl TranscriptSnapshot {
    /// Returns whether the message at `index` is still receiving deltas.
    pub fn is_open(&self, index: usize) -> bool {
        self.open == Some(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_call_content_omits_missing_args() {
        let message = Message::tool_call("x", None);
        assert_eq!(message.content, MessageContent::Structured(json!({"name": "x"})));

        let message = Message::tool_call("x", Some(json!({"a": 1})));
        assert_eq!(
            message.content,
            MessageContent::Structured(json!({"name": "x", "args": {"a": 1}}))
        );
    }

    #[test]
    fn test_message_serializes_without_empty_reasoning() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, json!({"role": "user", "content": "hi"}));
    }
}
