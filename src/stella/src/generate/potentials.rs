//! Potential attribution
//!
//! Upstream never states a potential's role directly. It is reconstructed by
//! cross-referencing three tables:
//!
//! - `CharPotential` lists, per character, which potential ids are offered
//!   to the main slot, the support slots, or both
//! - `Potential` ties each potential to its character and build
//! - `Item` carries the `Stype`/`Rarity` codes the rarity derives from

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::tables::{entries, record, Record, TextTable, Texts};
use super::assemble::params;
use super::GenerateError;
use crate::database::Potential;
use crate::reference::{potential_rarity, PotentialType};

/// Field marking a `CharPotential` record as complete
const CLASSIFICATION_FIELD: &str = "MasterSpecificPotentialIds";

/// Potential ids offered to one character, by role
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PotentialGroups {
    /// MasterSpecific + MasterNormal
    pub main: HashSet<u32>,
    /// AssistSpecific + AssistNormal
    pub assist: HashSet<u32>,
    pub common: HashSet<u32>,
}

impl PotentialGroups {
    fn from_record(record: &Record<'_>) -> Result<Self, GenerateError> {
        let mut groups = PotentialGroups::default();
        groups.main.extend(record.ids("MasterSpecificPotentialIds")?);
        groups.main.extend(record.ids("MasterNormalPotentialIds")?);
        groups.assist.extend(record.ids("AssistSpecificPotentialIds")?);
        groups.assist.extend(record.ids("AssistNormalPotentialIds")?);
        groups.common.extend(record.ids("CommonPotentialIds")?);
        Ok(groups)
    }

    /// Role of a potential; the first matching group wins
    pub fn classify(&self, potential_id: u32) -> Option<PotentialType> {
        if self.main.contains(&potential_id) {
            Some(PotentialType::Main)
        } else if self.assist.contains(&potential_id) {
            Some(PotentialType::Assist)
        } else if self.common.contains(&potential_id) {
            Some(PotentialType::Common)
        } else {
            None
        }
    }
}

/// Per-character potential groups built from `CharPotential`
#[derive(Debug, Default)]
pub struct CrossReference {
    pub groups: HashMap<u32, PotentialGroups>,
    /// Characters whose record lacks its classification payload
    pub incomplete: BTreeSet<u32>,
}

/// Build the character → potential-group mapping.
///
/// Records without `MasterSpecificPotentialIds` are marked incomplete and
/// their characters are left out of attribution entirely.
pub fn cross_reference(char_potential: &Value) -> Result<CrossReference, GenerateError> {
    let mut xref = CrossReference::default();

    for rec in entries(char_potential, "CharPotential")? {
        let character_id = match rec.get("Id") {
            Some(id) => super::tables::parse_id(id, || format!("CharPotential.{}.Id", rec.id))?,
            None => rec.id,
        };

        if rec.get(CLASSIFICATION_FIELD).is_none() {
            xref.incomplete.insert(character_id);
            continue;
        }
        xref.groups
            .insert(character_id, PotentialGroups::from_record(&rec)?);
    }

    if !xref.incomplete.is_empty() {
        tracing::warn!(
            characters = ?xref.incomplete,
            "excluding characters with incomplete potential classification"
        );
    }
    Ok(xref)
}

/// Build every attributable potential, grouped by character id.
///
/// Potentials keep upstream order (ascending id) within each character.
pub fn attribute(
    xref: &CrossReference,
    potentials: &Value,
    items: &Value,
    texts: &Texts<'_>,
) -> Result<BTreeMap<u32, Vec<Potential>>, GenerateError> {
    let mut by_character: BTreeMap<u32, Vec<Potential>> = BTreeMap::new();

    for rec in entries(potentials, "Potential")? {
        let character_id = rec.id_field("CharId")?;
        if xref.incomplete.contains(&character_id) {
            continue;
        }

        let potential_id = rec.id_field("Id")?;
        let item = record(items, "Item", potential_id)?;
        let stype = item.int("Stype")?;
        let rarity_code = item.int("Rarity")?;
        let rarity = potential_rarity(stype, rarity_code).ok_or(
            GenerateError::UnknownPotentialType {
                potential_id,
                stype,
                rarity: rarity_code,
            },
        )?;

        let kind = xref
            .groups
            .get(&character_id)
            .and_then(|groups| groups.classify(potential_id))
            .ok_or(GenerateError::UnknownPotentialClassification {
                character_id,
                potential_id,
            })?;

        let potential = Potential {
            id: potential_id,
            name: texts.text(TextTable::Item, potential_id, 1)?,
            desc_short: texts.text(TextTable::Potential, potential_id, 1)?,
            desc_long: texts.text(TextTable::Potential, potential_id, 2)?,
            rarity,
            build: rec.id_field("Build")?,
            kind,
            params: params(&rec)?,
        };
        by_character.entry(character_id).or_default().push(potential);
    }

    Ok(by_character)
}
