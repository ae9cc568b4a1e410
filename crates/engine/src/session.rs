use allianceforge_protocol::Gender;

/// Temporary commander gender for the current play session.
///
/// Starts empty and falls back to the profile gender. Has no serde impls; an
/// override lives as long as the session value that owns it and never reaches
/// a profile store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionGenderOverride {
    value: Option<Gender>,
}

impl SessionGenderOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<Gender> {
        self.value
    }

    pub fn effective_gender(&self, profile_gender: Gender) -> Gender {
        self.value.unwrap_or(profile_gender)
    }

    pub fn set(&mut self, gender: Gender) {
        self.value = Some(gender);
    }

    /// Flip whatever is currently shown.
    pub fn toggle(&mut self, profile_gender: Gender) -> Gender {
        let next = self.effective_gender(profile_gender).toggled();
        self.value = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.value = None;
    }

    /// True when a reset affordance should be offered.
    pub fn is_custom(&self, profile_gender: Gender) -> bool {
        matches!(self.value, Some(g) if g != profile_gender)
    }
}

impl From<Option<Gender>> for SessionGenderOverride {
    fn from(value: Option<Gender>) -> Self {
        Self { value }
    }
}
