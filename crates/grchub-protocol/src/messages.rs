//! Conversation message types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Knowledge-base category filter shared by client and server.
///
/// Absence (`None` in [`ChatRequest::category`]) means "all categories".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Risks,
    Compliance,
    Regulatory,
    Recommendation,
}

impl Category {
    /// All known categories, in display order.
    pub const ALL: [Category; 4] = [
        Category::Risks,
        Category::Compliance,
        Category::Regulatory,
        Category::Recommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Risks => "risks",
            Self::Compliance => "compliance",
            Self::Regulatory => "regulatory",
            Self::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "risks" => Ok(Self::Risks),
            "compliance" => Ok(Self::Compliance),
            "regulatory" => Ok(Self::Regulatory),
            "recommendation" => Ok(Self::Recommendation),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// One typed content unit within a message.
///
/// Only text parts exist today; the tagged representation is the extension
/// point for other kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
}

/// A single conversation message: stable id, role, ordered parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// Build a fresh one-part text message with a generated id.
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// Concatenated content of all text parts.
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                MessagePart::Text { text } => text.as_str(),
            })
            .collect()
    }

    /// Append to the last text part, or add one if none exists.
    pub fn push_text(&mut self, delta: &str) {
        match self.parts.last_mut() {
            Some(MessagePart::Text { text }) => text.push_str(delta),
            None => self.parts.push(MessagePart::Text {
                text: delta.to_string(),
            }),
        }
    }
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Active category filter; `None` means all categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}
