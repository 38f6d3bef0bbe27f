//! Character and disc assembly

use serde_json::Value;
use std::collections::BTreeMap;

use super::tables::{entries, list_values, parse_id, record, Record, TextTable, Texts};
use super::GenerateError;
use crate::database::{Character, Disc, DiscSkill, NotesPair, ParamCollection, Potential};
use crate::reference::{CharacterClass, Element, Rarity, UnknownCode, PLACEHOLDER_NAME};

/// `CharacterDes` field numbers
const CHAR_NAME: u32 = 2;
const MAIN_BUILD1_NAME: u32 = 4;
const MAIN_BUILD2_NAME: u32 = 5;
const SUPPORT_BUILD1_NAME: u32 = 6;
const SUPPORT_BUILD2_NAME: u32 = 7;
const MAIN_BUILD1_DESC: u32 = 9;
const MAIN_BUILD2_DESC: u32 = 10;
const SUPPORT_BUILD1_DESC: u32 = 11;
const SUPPORT_BUILD2_DESC: u32 = 12;

/// Read a code field and map it onto a reference enumeration
fn code_field<T>(rec: &Record<'_>, field: &'static str) -> Result<T, GenerateError>
where
    T: TryFrom<i64, Error = UnknownCode>,
{
    let code = rec.int(field)?;
    T::try_from(code).map_err(|e| GenerateError::Parse {
        value: code.to_string(),
        context: format!("{}.{}.{}: {}", rec.table, rec.id, field, e),
    })
}

/// Assemble published characters.
///
/// Characters without attributed potentials and characters whose name is
/// still the placeholder are left out.
pub fn characters(
    table: &Value,
    mut potentials: BTreeMap<u32, Vec<Potential>>,
    texts: &Texts<'_>,
) -> Result<Vec<Character>, GenerateError> {
    let mut characters = Vec::new();

    for rec in entries(table, "Character")? {
        let id = rec.id;
        let Some(potentials) = potentials.remove(&id) else {
            continue;
        };

        let name = texts.text(TextTable::CharacterDes, id, CHAR_NAME)?;
        if name == PLACEHOLDER_NAME {
            tracing::debug!(id, "skipping unreleased character");
            continue;
        }

        let text = |field| texts.text(TextTable::CharacterDes, id, field);
        characters.push(Character {
            id,
            class: code_field::<CharacterClass>(&rec, "Class")?,
            element: code_field::<Element>(&rec, "EET")?,
            rarity: code_field::<Rarity>(&rec, "Grade")?,
            main_build1_name: text(MAIN_BUILD1_NAME)?,
            main_build1_desc: text(MAIN_BUILD1_DESC)?,
            main_build2_name: text(MAIN_BUILD2_NAME)?,
            main_build2_desc: text(MAIN_BUILD2_DESC)?,
            support_build1_name: text(SUPPORT_BUILD1_NAME)?,
            support_build1_desc: text(SUPPORT_BUILD1_DESC)?,
            support_build2_name: text(SUPPORT_BUILD2_NAME)?,
            support_build2_desc: text(SUPPORT_BUILD2_DESC)?,
            name,
            potentials,
        });
    }

    if !potentials.is_empty() {
        tracing::debug!(
            characters = ?potentials.keys().collect::<Vec<_>>(),
            "potentials attributed to characters missing from the character table"
        );
    }
    Ok(characters)
}

/// Assemble published discs with their skills
pub fn discs(
    discs: &Value,
    skills: &Value,
    texts: &Texts<'_>,
) -> Result<Vec<Disc>, GenerateError> {
    let mut result = Vec::new();

    for rec in entries(discs, "Disc")? {
        let name = texts.text(TextTable::Disc, rec.id, 1)?;
        if name == PLACEHOLDER_NAME {
            tracing::debug!(id = rec.id, "skipping unreleased disc");
            continue;
        }

        let skills = rec
            .ids("SkillIds")?
            .into_iter()
            .map(|skill_id| disc_skill(&record(skills, "DiscSkill", skill_id)?, texts))
            .collect::<Result<Vec<_>, _>>()?;

        result.push(Disc {
            id: rec.id,
            name,
            desc: texts.text(TextTable::Disc, rec.id, 2)?,
            element: code_field::<Element>(&rec, "EET")?,
            rarity: rec.id_field("Rarity")?,
            skills,
        });
    }

    Ok(result)
}

/// `Params` of a potential or disc skill record: `[{Idx, Values}]`, absent when empty
pub(super) fn params(rec: &Record<'_>) -> Result<Vec<ParamCollection>, GenerateError> {
    let context = |field: &str| format!("{}.{}.{}", rec.table, rec.id, field);
    let malformed = |field: &str, value: &Value| GenerateError::Parse {
        value: value.to_string(),
        context: context(field),
    };

    let mut params = Vec::new();
    if let Some(value) = rec.get("Params") {
        for param in list_values(value).ok_or_else(|| malformed("Params", value))? {
            let idx = parse_id(
                param.get("Idx").unwrap_or(&Value::Null),
                || context("Params.Idx"),
            )?;
            let values = param
                .get("Values")
                .and_then(list_values)
                .ok_or_else(|| malformed("Params.Values", param))?
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            params.push(ParamCollection { idx, values });
        }
    }
    Ok(params)
}

fn disc_skill(rec: &Record<'_>, texts: &Texts<'_>) -> Result<DiscSkill, GenerateError> {
    let malformed = |field: &str, value: &Value| GenerateError::Parse {
        value: value.to_string(),
        context: format!("{}.{}.{}", rec.table, rec.id, field),
    };

    let mut notes = Vec::new();
    if let Some(value) = rec.get("Notes") {
        for level in list_values(value).ok_or_else(|| malformed("Notes", value))? {
            let pairs = list_values(level)
                .ok_or_else(|| malformed("Notes", level))?
                .into_iter()
                .map(|pair| note_pair(pair).ok_or_else(|| malformed("Notes", pair)))
                .collect::<Result<Vec<NotesPair>, _>>()?;
            notes.push(pairs);
        }
    }

    Ok(DiscSkill {
        name: texts.text(TextTable::DiscSkill, rec.id, 1)?,
        desc: texts.text(TextTable::DiscSkill, rec.id, 2)?,
        params: params(rec)?,
        notes,
    })
}

fn note_pair(value: &Value) -> Option<NotesPair> {
    let pair = list_values(value)?;
    let [note, threshold] = pair.as_slice() else {
        return None;
    };
    let note = parse_id(note, String::new).ok()?;
    let threshold = parse_id(threshold, String::new).ok()?;
    Some((note, threshold))
}
