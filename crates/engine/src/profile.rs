//! Player profile and the store it is persisted through.

use crate::characters::character_for_avatar;
use crate::portrait::{resolve_portrait, Portrait};
use crate::session::SessionGenderOverride;
use allianceforge_protocol::Gender;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("callsign must not be empty")]
    EmptyName,
    #[error("no commander profile has been registered")]
    NotRegistered,
}

/// Persistent commander profile.
///
/// `commander_gender` is private: it is set at registration and changed only
/// through [`PlayerProfile::edit`], never by gameplay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    name: String,
    avatar_url: String,
    commander_gender: Gender,
    #[serde(default)]
    equipped_uniform_pieces: BTreeSet<String>,
}

impl PlayerProfile {
    pub fn register(name: &str, avatar_url: &str) -> Result<Self, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let character = character_for_avatar(avatar_url);
        Ok(Self {
            name: name.to_string(),
            avatar_url: character.url.to_string(),
            commander_gender: character.gender,
            equipped_uniform_pieces: BTreeSet::new(),
        })
    }

    /// Profile edit: new callsign and avatar. The avatar decides the stored gender.
    pub fn edit(&mut self, name: &str, avatar_url: &str) -> Result<(), ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let character = character_for_avatar(avatar_url);
        self.name = name.to_string();
        self.avatar_url = character.url.to_string();
        self.commander_gender = character.gender;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn avatar_url(&self) -> &str {
        &self.avatar_url
    }

    pub fn commander_gender(&self) -> Gender {
        self.commander_gender
    }

    pub fn equipped_uniform_pieces(&self) -> &BTreeSet<String> {
        &self.equipped_uniform_pieces
    }

    pub fn equipped_count(&self) -> usize {
        self.equipped_uniform_pieces.len()
    }

    /// Returns false if the piece was already equipped.
    pub fn equip(&mut self, piece: &str) -> bool {
        self.equipped_uniform_pieces.insert(piece.to_string())
    }

    pub fn unequip(&mut self, piece: &str) -> bool {
        self.equipped_uniform_pieces.remove(piece)
    }

    pub fn portrait(&self, session: &SessionGenderOverride) -> Portrait {
        resolve_portrait(
            session.effective_gender(self.commander_gender),
            self.equipped_count(),
        )
    }
}

pub trait ProfileStore: Send + Sync {
    fn read(&self) -> anyhow::Result<Option<PlayerProfile>>;
    fn write(&self, profile: &PlayerProfile) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    inner: Mutex<Option<PlayerProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read(&self) -> anyhow::Result<Option<PlayerProfile>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("profile store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn write(&self, profile: &PlayerProfile) -> anyhow::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("profile store lock poisoned"))?;
        *guard = Some(profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portrait::PortraitStage;

    const FEMALE2: &str = "https://picsum.photos/seed/female2/200";
    const MALE3: &str = "https://picsum.photos/seed/male3/200";

    #[test]
    fn register_takes_gender_from_avatar() {
        let p = PlayerProfile::register("  Vega ", MALE3).unwrap();
        assert_eq!(p.name(), "Vega");
        assert_eq!(p.commander_gender(), Gender::Male);
        assert_eq!(p.equipped_count(), 0);
    }

    #[test]
    fn register_rejects_blank_name() {
        assert_eq!(
            PlayerProfile::register("   ", MALE3),
            Err(ProfileError::EmptyName)
        );
    }

    #[test]
    fn edit_changes_stored_gender() {
        let mut p = PlayerProfile::register("Vega", MALE3).unwrap();
        p.edit("Vega", FEMALE2).unwrap();
        assert_eq!(p.commander_gender(), Gender::Female);
        assert_eq!(p.avatar_url(), FEMALE2);
    }

    #[test]
    fn session_override_never_touches_profile() {
        let mut p = PlayerProfile::register("Vega", MALE3).unwrap();
        p.equip("gloves");
        p.equip("boots");
        p.equip("rig");
        let mut session = SessionGenderOverride::new();
        session.toggle(p.commander_gender());

        let portrait = p.portrait(&session);
        assert_eq!(portrait.gender, Gender::Female);
        assert_eq!(portrait.stage, PortraitStage::CombatArmor);
        assert_eq!(p.commander_gender(), Gender::Male);
    }

    #[test]
    fn equipment_has_set_semantics() {
        let mut p = PlayerProfile::register("Vega", MALE3).unwrap();
        assert!(p.equip("helmet"));
        assert!(!p.equip("helmet"));
        assert_eq!(p.equipped_count(), 1);
        assert!(p.unequip("helmet"));
        assert!(!p.unequip("helmet"));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryProfileStore::new();
        assert!(store.read().unwrap().is_none());
        let p = PlayerProfile::register("Vega", FEMALE2).unwrap();
        store.write(&p).unwrap();
        assert_eq!(store.read().unwrap(), Some(p));
    }
}
