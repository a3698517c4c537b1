//! Test fixtures.

use chrono::Utc;
use lexchat_core::{Attachment, ChatMessage, Role, SharedChat, Source, TrackerConfig};
use uuid::Uuid;

/// Password `MockBackend` and the fake server accept.
pub const PASSWORD: &str = "correct-horse";

pub const EMAIL: &str = "counsel@example.com";

/// One hour in chrono terms.
pub fn hours(n: i64) -> chrono::Duration {
    chrono::Duration::hours(n)
}

pub fn tracker_config(message_limit: u32, reset_window_hours: i64) -> TrackerConfig {
    TrackerConfig {
        message_limit,
        reset_window_hours,
    }
}

pub fn attachment(name: &str) -> Attachment {
    Attachment {
        id: Uuid::new_v4().to_string(),
        file_name: name.to_string(),
        file_type: "application/pdf".to_string(),
        file_size: Some(2048),
    }
}

pub fn chat_message(chat_id: &str, role: Role, content: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        chat_id: chat_id.to_string(),
        content: content.to_string(),
        role,
        created_at: Utc::now().to_rfc3339(),
        sources: match role {
            Role::Human => vec![],
            Role::Assistant => vec![Source {
                url: "https://law.example.com/tenancy".into(),
            }],
        },
        attachments: vec![],
    }
}

/// A two-turn shared conversation.
pub fn shared_chat(id: &str) -> SharedChat {
    SharedChat {
        id: id.to_string(),
        title: Some("Deposit dispute".to_string()),
        messages: vec![
            chat_message(id, Role::Human, "Can my landlord keep the deposit?"),
            chat_message(id, Role::Assistant, "Only for documented damage."),
        ],
    }
}
