use serde::{Deserialize, Serialize};

/// Commander gender. Drives both the portrait set and the avatar catalog filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn toggled(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    User,
    Ai,
    System,
}

/// One entry in a conversation log. Built through the engine's per-kind
/// constructors; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_kind: SenderKind,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
    pub content: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub response: ChatMessage,
    pub is_business_window: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStatus {
    pub is_business_window: bool,
    pub window_start: u32,
    pub window_end: u32,
    pub timezone: String,
    pub ai_available: bool,
    pub system_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipInput {
    pub piece: String,
}

pub mod defaults {
    pub const TIMEZONE: &str = "UTC";
    pub const DISPLAY_NAME: &str = "Commander";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_fields_are_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message.as_deref(), Some("hi"));
        assert!(req.timezone.is_none());
        assert!(req.display_name.is_none());

        let empty: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.message.is_none());
    }

    #[test]
    fn chat_message_uses_camel_case_wire_names() {
        let msg = ChatMessage {
            id: "m1".into(),
            sender_id: "core_ai".into(),
            sender_kind: SenderKind::Ai,
            display_name: "C.O.R.E. AI".into(),
            avatar_ref: None,
            content: "hello".into(),
            timestamp: 1,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["senderKind"], "ai");
        assert_eq!(v["displayName"], "C.O.R.E. AI");
        assert!(v.get("avatarRef").is_none());
    }

    #[test]
    fn gender_round_trips_through_str() {
        for g in [Gender::Male, Gender::Female] {
            assert_eq!(Gender::parse(g.as_str()), Some(g));
            assert_eq!(g.toggled().toggled(), g);
        }
        assert_eq!(Gender::parse("other"), None);
    }
}
