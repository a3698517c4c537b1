//! Chat domain types shared with the backend.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{MAX_ATTACHMENTS, MAX_MESSAGE_CHARS};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

/// A file already uploaded to the backend, referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Citation attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
}

/// A message in a chat's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub content: String,
    pub role: Role,
    pub created_at: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Entry in the user's chat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A chat published through a share link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedChat {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl SharedChat {
    /// History to send along with the first message that continues this chat.
    pub fn prior_messages(&self) -> Vec<PriorMessage> {
        self.messages.iter().map(PriorMessage::from).collect()
    }
}

/// Earlier turn sent with a message that continues a shared chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl From<&ChatMessage> for PriorMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            sources: msg.sources.clone(),
        }
    }
}

/// Outgoing message as composed by the user.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub previous_messages: Vec<PriorMessage>,
}

impl MessageDraft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_previous_messages(mut self, previous: Vec<PriorMessage>) -> Self {
        self.previous_messages = previous;
        self
    }

    /// A draft is sendable if it has text or at least one attachment.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() && self.attachments.is_empty() {
            return Err(Error::validation_code(
                ValidationErrorCode::EmptyMessage,
                "Message has no text and no attachments",
            ));
        }

        let chars = self.text.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(Error::validation_code(
                ValidationErrorCode::MessageTooLong,
                format!("Message has {} chars, exceeds {} limit", chars, MAX_MESSAGE_CHARS),
            ));
        }

        if self.attachments.len() > MAX_ATTACHMENTS {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidFormat,
                format!(
                    "Message has {} attachments, exceeds {} limit",
                    self.attachments.len(),
                    MAX_ATTACHMENTS
                ),
            ));
        }

        Ok(())
    }

    /// Builds the wire request for the given chat.
    pub fn to_request(&self, chat_id: Option<String>) -> ChatRequest {
        ChatRequest {
            message: self.text.clone(),
            chat_id,
            attachment_ids: self.attachments.iter().map(|a| a.id.clone()).collect(),
            previous_messages: self.previous_messages.clone(),
        }
    }
}

/// Body of `POST /api/v1/chatbot/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(max = 10000))]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_messages: Vec<PriorMessage>,
}

/// Backend answer to a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub chat_id: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Server-side enforcement of the anonymous limit.
    #[serde(default)]
    pub limit_reached: bool,
}
