//! Shareable build data
//!
//! A build is a user's selection of characters, discs and potentials. It is
//! persisted only as a token (see [`crate::codec`]), so unknown properties
//! written by newer page versions are carried through untouched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::{Validate, Violation};

/// Maximum serialized JSON size of a build, in bytes
pub const MAX_BUILD_JSON_LEN: usize = 5000;

/// Top-level property names owned by [`BuildData`]
const BUILD_FIELDS: &[&str] = &[
    "name",
    "description",
    "id",
    "mainId",
    "support1Id",
    "support2Id",
    "discId",
    "disc1Id",
    "disc2Id",
    "potentialIds",
    "potentialConfigs",
    "levelMap",
    "notes",
    "editMode",
];

/// Property names owned by [`PotentialConfig`]
const CONFIG_FIELDS: &[&str] = &["level", "priority"];

/// Per-potential settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PotentialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Properties this version does not know about
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A user-composed build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildData {
    pub name: String,
    pub description: String,
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support1_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support2_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc1_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc2_id: Option<u32>,

    /// Selected potentials in display order
    pub potential_ids: Vec<u32>,

    /// `[potentialId, config]` pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_configs: Option<Vec<(u32, PotentialConfig)>>,

    /// Deprecated `[potentialId, level]` pairs written before `potentialConfigs`
    /// existed; read-only fallback for old tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_map: Option<Vec<(u32, u32)>>,

    /// `[noteId, count]` pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<(u32, u32)>>,

    pub edit_mode: bool,

    /// Properties this version does not know about
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BuildData {
    /// Settings recorded for a potential, if any
    pub fn config_for(&self, potential_id: u32) -> Option<&PotentialConfig> {
        self.potential_configs
            .as_ref()?
            .iter()
            .find(|(id, _)| *id == potential_id)
            .map(|(_, config)| config)
    }

    /// Level of a potential, preferring `potentialConfigs` over the legacy map
    pub fn potential_level(&self, potential_id: u32) -> Option<u32> {
        if let Some(level) = self.config_for(potential_id).and_then(|c| c.level) {
            return Some(level);
        }
        self.level_map
            .as_ref()?
            .iter()
            .find(|(id, _)| *id == potential_id)
            .map(|(_, level)| *level)
    }

    /// Character ids in slot order (main, support 1, support 2), skipping empty slots
    pub fn character_ids(&self) -> impl Iterator<Item = u32> + '_ {
        [self.main_id, self.support1_id, self.support2_id]
            .into_iter()
            .flatten()
    }

    /// Disc ids in slot order, skipping empty slots
    pub fn disc_ids(&self) -> impl Iterator<Item = u32> + '_ {
        [self.disc_id, self.disc1_id, self.disc2_id].into_iter().flatten()
    }
}

fn reserved_extras<'a>(
    extra: &'a BTreeMap<String, Value>,
    reserved: &'a [&str],
    prefix: &'a str,
) -> impl Iterator<Item = Violation> + 'a {
    extra
        .keys()
        .filter(|key| reserved.contains(&key.as_str()))
        .map(move |key| {
            Violation::new(
                format!("{}/{}", prefix, key),
                "reserved property duplicated as an extension",
            )
        })
}

impl Validate for BuildData {
    const SUBJECT: &'static str = "build data";

    fn violations(&self) -> Vec<Violation> {
        let mut violations: Vec<Violation> =
            reserved_extras(&self.extra, BUILD_FIELDS, "").collect();

        if let Some(configs) = &self.potential_configs {
            for (index, (_, config)) in configs.iter().enumerate() {
                let prefix = format!("/potentialConfigs/{}/1", index);
                violations.extend(reserved_extras(&config.extra, CONFIG_FIELDS, &prefix));
            }
        }

        violations
    }
}
