//! Per-sender constructors for [`ChatMessage`].
//!
//! Each sender kind carries a fixed identity (id, display name, avatar), so
//! messages are only built through these functions.

use allianceforge_protocol::{ChatMessage, SenderKind};

pub const AI_SENDER_ID: &str = "core_ai";
pub const AI_DISPLAY_NAME: &str = "C.O.R.E. AI";
pub const AI_AVATAR: &str = "https://i.imgur.com/8D3wW8E.png";

pub const COMMAND_SENDER_ID: &str = "alliance_command";
pub const COMMAND_DISPLAY_NAME: &str = "Alliance Command";
pub const COMMAND_AVATAR: &str = "https://i.imgur.com/9B2wX1F.png";

pub const ERROR_SENDER_ID: &str = "system_error";
pub const USER_SENDER_ID: &str = "user";

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn user_message(display_name: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id: new_id(),
        sender_id: USER_SENDER_ID.to_string(),
        sender_kind: SenderKind::User,
        display_name: display_name.to_string(),
        avatar_ref: None,
        content: content.to_string(),
        timestamp: now_ms(),
    }
}

pub fn ai_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage {
        id: new_id(),
        sender_id: AI_SENDER_ID.to_string(),
        sender_kind: SenderKind::Ai,
        display_name: AI_DISPLAY_NAME.to_string(),
        avatar_ref: Some(AI_AVATAR.to_string()),
        content: content.into(),
        timestamp: now_ms(),
    }
}

pub fn command_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage {
        id: new_id(),
        sender_id: COMMAND_SENDER_ID.to_string(),
        sender_kind: SenderKind::System,
        display_name: COMMAND_DISPLAY_NAME.to_string(),
        avatar_ref: Some(COMMAND_AVATAR.to_string()),
        content: content.into(),
        timestamp: now_ms(),
    }
}

/// Synthetic entry appended when a send fails in transport.
pub fn error_message() -> ChatMessage {
    ChatMessage {
        id: new_id(),
        sender_id: ERROR_SENDER_ID.to_string(),
        sender_kind: SenderKind::System,
        display_name: "System".to_string(),
        avatar_ref: None,
        content: "Sorry, there was an error processing your message. Please try again."
            .to_string(),
        timestamp: now_ms(),
    }
}
