//! Commander portrait selection.
//!
//! The portrait shown for a commander depends only on the effective gender and
//! how many uniform pieces are equipped. Every (stage, gender) pair maps to one
//! static image, so resolution has no error path.

use allianceforge_protocol::Gender;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PortraitStage {
    Base,
    BasicGear,
    CombatArmor,
    FullUniform,
}

impl PortraitStage {
    /// Thresholds are inclusive and checked in order: 0, 1-2, 3-4, 5+.
    pub fn from_equipped(count: usize) -> Self {
        match count {
            0 => Self::Base,
            1..=2 => Self::BasicGear,
            3..=4 => Self::CombatArmor,
            _ => Self::FullUniform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portrait {
    pub image_ref: &'static str,
    pub alt_text: &'static str,
    pub hint: &'static str,
    pub stage: PortraitStage,
    pub gender: Gender,
}

pub fn resolve_portrait(gender: Gender, equipped_count: usize) -> Portrait {
    let stage = PortraitStage::from_equipped(equipped_count);
    let (image_ref, hint) = match (stage, gender) {
        (PortraitStage::Base, Gender::Male) => {
            ("https://i.imgur.com/iuRJVBZ.png", "fullbody male commander")
        }
        (PortraitStage::Base, Gender::Female) => {
            ("https://i.imgur.com/BQHeVWp.png", "fullbody female commander")
        }
        (PortraitStage::BasicGear, Gender::Male) => {
            ("https://i.imgur.com/83pL36g.png", "male commander gloves boots")
        }
        (PortraitStage::BasicGear, Gender::Female) => {
            ("https://i.imgur.com/7L48yPE.png", "female commander gloves boots")
        }
        (PortraitStage::CombatArmor, Gender::Male) => {
            ("https://i.imgur.com/tQ4zJ2a.png", "male commander armor")
        }
        (PortraitStage::CombatArmor, Gender::Female) => {
            ("https://i.imgur.com/26Xn9A8.png", "female commander armor")
        }
        (PortraitStage::FullUniform, Gender::Male) => (
            "https://i.imgur.com/iR322b2.png",
            "male commander full armor helmet",
        ),
        (PortraitStage::FullUniform, Gender::Female) => (
            "https://i.imgur.com/K3tB9gH.png",
            "female commander full armor helmet",
        ),
    };
    let alt_text = match gender {
        Gender::Male => "Male Commander",
        Gender::Female => "Female Commander",
    };
    Portrait {
        image_ref,
        alt_text,
        hint,
        stage,
        gender,
    }
}
