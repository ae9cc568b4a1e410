use allianceforge_protocol::Gender;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: &'static str,
    pub url: &'static str,
    pub gender: Gender,
    pub hint: &'static str,
    pub name: &'static str,
}

const fn character(
    id: &'static str,
    url: &'static str,
    gender: Gender,
    name: &'static str,
) -> Character {
    let hint = match gender {
        Gender::Male => "male commander",
        Gender::Female => "female commander",
    };
    Character {
        id,
        url,
        gender,
        hint,
        name,
    }
}

static CHARACTERS: [Character; 8] = [
    character("female1", "https://picsum.photos/seed/female1/200", Gender::Female, "Commander Nova"),
    character("female2", "https://picsum.photos/seed/female2/200", Gender::Female, "Commander Aria"),
    character("female3", "https://picsum.photos/seed/female3/200", Gender::Female, "Commander Luna"),
    character("female4", "https://picsum.photos/seed/female4/200", Gender::Female, "Commander Zara"),
    character("male1", "https://picsum.photos/seed/male1/200", Gender::Male, "Commander Rex"),
    character("male2", "https://picsum.photos/seed/male2/200", Gender::Male, "Commander Kane"),
    character("male3", "https://picsum.photos/seed/male3/200", Gender::Male, "Commander Orion"),
    character("male4", "https://picsum.photos/seed/male4/200", Gender::Male, "Commander Atlas"),
];

pub fn characters() -> &'static [Character] {
    &CHARACTERS
}

pub fn default_character() -> &'static Character {
    &CHARACTERS[0]
}

pub fn character_by_id(id: &str) -> Option<&'static Character> {
    CHARACTERS.iter().find(|c| c.id == id)
}

pub fn characters_by_gender(gender: Gender) -> impl Iterator<Item = &'static Character> {
    CHARACTERS.iter().filter(move |c| c.gender == gender)
}

/// Unknown avatar URLs resolve to the first catalog entry.
pub fn character_for_avatar(url: &str) -> &'static Character {
    CHARACTERS
        .iter()
        .find(|c| c.url == url)
        .unwrap_or_else(default_character)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_split_evenly() {
        assert_eq!(characters().len(), 8);
        assert_eq!(characters_by_gender(Gender::Male).count(), 4);
        assert_eq!(characters_by_gender(Gender::Female).count(), 4);
    }

    #[test]
    fn lookup_by_id_and_avatar() {
        let rex = character_by_id("male1").unwrap();
        assert_eq!(rex.name, "Commander Rex");
        assert_eq!(character_for_avatar(rex.url), rex);
        assert!(character_by_id("nobody").is_none());
        assert_eq!(character_for_avatar("https://example.invalid/x.png").id, "female1");
    }
}
