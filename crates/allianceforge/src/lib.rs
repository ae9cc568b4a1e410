//! Client-facing entry point for Alliance Forge.
//!
//! Game front ends drive a commander profile and the C.O.R.E. chat thread;
//! [`prelude`] gathers what they need so a single `use` covers it.

pub use allianceforge_engine as engine;
pub use allianceforge_protocol as protocol;

pub mod prelude {
    pub use allianceforge_engine::{
        characters, resolve_portrait, ChatThread, ChatTransport, HttpChatTransport, PlayerProfile,
        Portrait, PortraitStage, SessionGenderOverride, TurnOutcome,
    };
    pub use allianceforge_protocol::{ChatMessage, ChatStatus, Gender, SenderKind};
}

/// Chat thread wired to a server at `base_url`, opened with the C.O.R.E.
/// welcome message.
pub fn connect_chat(
    base_url: impl Into<String>,
    timezone: impl Into<String>,
    display_name: impl Into<String>,
) -> (prelude::ChatThread, prelude::HttpChatTransport) {
    let mut thread = prelude::ChatThread::new(timezone, display_name);
    thread.add_welcome_message();
    (thread, prelude::HttpChatTransport::new(base_url))
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::*;

    #[test]
    fn connect_chat_starts_with_welcome() {
        let (thread, _transport) = connect_chat("http://127.0.0.1:39333/", "UTC", "Vega");
        assert_eq!(thread.messages().len(), 1);
        assert_eq!(thread.messages()[0].sender_kind, SenderKind::Ai);
        assert!(!thread.is_business_window());
    }

    #[test]
    fn session_override_through_prelude() {
        let profile = PlayerProfile::register("Vega", characters()[4].url).unwrap();
        assert_eq!(profile.commander_gender(), Gender::Male);
        let mut session = SessionGenderOverride::new();
        session.toggle(profile.commander_gender());
        let portrait = profile.portrait(&session);
        assert_eq!(portrait.gender, Gender::Female);
        assert_eq!(portrait.stage, PortraitStage::Base);
    }
}
