//! Generated game database
//!
//! One [`Database`] snapshot exists per language. Snapshots are produced
//! wholesale by [`crate::generate`] and are read-only afterwards.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::reference::{
    CharacterClass, Element, PotentialRarity, PotentialType, Rarity, PLACEHOLDER_NAME,
};
use crate::schema::{Validate, Violation};

/// One leveled parameter of a potential or disc skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParamCollection {
    pub idx: u32,
    /// Value per level, as displayed (may carry units such as `%`)
    pub values: Vec<String>,
}

/// `[noteId, threshold]`
pub type NotesPair = (u32, u32);

/// A playable character (Trekker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: u32,
    pub name: String,
    pub class: CharacterClass,
    pub element: Element,
    pub rarity: Rarity,
    pub main_build1_name: String,
    pub main_build1_desc: String,
    pub main_build2_name: String,
    pub main_build2_desc: String,
    pub support_build1_name: String,
    pub support_build1_desc: String,
    pub support_build2_name: String,
    pub support_build2_desc: String,
    pub potentials: Vec<Potential>,
}

/// An upgradeable trait offered to a character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Potential {
    pub id: u32,
    pub name: String,
    pub desc_short: String,
    pub desc_long: String,
    pub rarity: PotentialRarity,
    /// Which of the character's standard builds this potential belongs to
    pub build: u32,
    /// Main build, support build, or both
    #[serde(rename = "type")]
    pub kind: PotentialType,
    /// Leveled values substituted into the descriptions
    #[serde(default)]
    pub params: Vec<ParamCollection>,
}

/// An equippable disc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Disc {
    pub id: u32,
    pub name: String,
    pub desc: String,
    pub element: Element,
    pub rarity: u32,
    pub skills: Vec<DiscSkill>,
}

/// A leveled disc skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiscSkill {
    pub name: String,
    pub desc: String,
    pub params: Vec<ParamCollection>,
    /// Note requirements per skill level
    pub notes: Vec<Vec<NotesPair>>,
}

/// A complete per-language snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub characters: Vec<Character>,
    pub discs: Vec<Disc>,

    /// Potential icon file names available on the asset origin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potential_icons: Vec<String>,

    /// Loading-screen image file names available on the asset origin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loading: Vec<String>,
}

impl Database {
    pub fn character(&self, id: u32) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn character_by_name(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn disc(&self, id: u32) -> Option<&Disc> {
        self.discs.iter().find(|d| d.id == id)
    }

    /// Find a potential and the character that owns it
    pub fn potential(&self, id: u32) -> Option<(&Character, &Potential)> {
        self.characters.iter().find_map(|c| {
            c.potentials
                .iter()
                .find(|p| p.id == id)
                .map(|p| (c, p))
        })
    }

    /// Every note id referenced by any disc skill, ascending and deduplicated
    pub fn note_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .discs
            .iter()
            .flat_map(|d| &d.skills)
            .flat_map(|s| &s.notes)
            .flatten()
            .map(|(note, _)| *note)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Record a violation for every id seen more than once
fn duplicate_ids(
    ids: impl Iterator<Item = (usize, u32)>,
    path: impl Fn(usize) -> String,
    violations: &mut Vec<Violation>,
) {
    let mut seen = HashSet::new();
    for (index, id) in ids {
        if !seen.insert(id) {
            violations.push(Violation::new(path(index), format!("duplicate id {}", id)));
        }
    }
}

impl Validate for Database {
    const SUBJECT: &'static str = "database";

    fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        duplicate_ids(
            self.characters.iter().map(|c| c.id).enumerate(),
            |i| format!("/characters/{}/id", i),
            &mut violations,
        );
        duplicate_ids(
            self.discs.iter().map(|d| d.id).enumerate(),
            |i| format!("/discs/{}/id", i),
            &mut violations,
        );

        for (ci, character) in self.characters.iter().enumerate() {
            if character.name.is_empty() || character.name == PLACEHOLDER_NAME {
                violations.push(Violation::new(
                    format!("/characters/{}/name", ci),
                    format!("unpublishable name {:?}", character.name),
                ));
            }
            if character.potentials.is_empty() {
                violations.push(Violation::new(
                    format!("/characters/{}/potentials", ci),
                    "character has no potentials",
                ));
            }
            duplicate_ids(
                character.potentials.iter().map(|p| p.id).enumerate(),
                |pi| format!("/characters/{}/potentials/{}/id", ci, pi),
                &mut violations,
            );
        }

        for (di, disc) in self.discs.iter().enumerate() {
            if disc.name.is_empty() || disc.name == PLACEHOLDER_NAME {
                violations.push(Violation::new(
                    format!("/discs/{}/name", di),
                    format!("unpublishable name {:?}", disc.name),
                ));
            }
        }

        violations
    }
}
