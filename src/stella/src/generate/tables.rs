//! Upstream table access
//!
//! Upstream tables are JSON objects keyed by numeric id. Numeric fields may
//! arrive as numbers or as strings; both are accepted but anything that is
//! not an integer aborts the run with the offending field named.

use serde_json::Value;
use std::collections::HashMap;

use super::GenerateError;
use crate::language::Language;

/// Game data tables (`{region}/bin/{name}.json`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinTable {
    Character,
    Item,
    Potential,
    CharPotential,
    Disc,
    DiscSkill,
}

impl BinTable {
    pub const ALL: &'static [BinTable] = &[
        BinTable::Character,
        BinTable::Item,
        BinTable::Potential,
        BinTable::CharPotential,
        BinTable::Disc,
        BinTable::DiscSkill,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinTable::Character => "Character",
            BinTable::Item => "Item",
            BinTable::Potential => "Potential",
            BinTable::CharPotential => "CharPotential",
            BinTable::Disc => "Disc",
            BinTable::DiscSkill => "DiscSkill",
        }
    }

    pub fn url(self, data_url: &str, language: Language) -> String {
        format!(
            "{}/{}/bin/{}.json",
            data_url.trim_end_matches('/'),
            language.region(),
            self.name()
        )
    }
}

/// Localized text tables (`{region}/language/{locale}/{name}.json`)
///
/// Keys are `"{name}.{id}.{field}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextTable {
    Item,
    Potential,
    CharacterDes,
    Disc,
    DiscSkill,
}

impl TextTable {
    pub const ALL: &'static [TextTable] = &[
        TextTable::Item,
        TextTable::Potential,
        TextTable::CharacterDes,
        TextTable::Disc,
        TextTable::DiscSkill,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextTable::Item => "Item",
            TextTable::Potential => "Potential",
            TextTable::CharacterDes => "CharacterDes",
            TextTable::Disc => "Disc",
            TextTable::DiscSkill => "DiscSkill",
        }
    }

    pub fn url(self, data_url: &str, language: Language) -> String {
        format!(
            "{}/{}/language/{}/{}.json",
            data_url.trim_end_matches('/'),
            language.region(),
            language.locale(),
            self.name()
        )
    }
}

/// Parse an integer from a JSON number or numeric string
pub fn parse_int(value: &Value, context: impl FnOnce() -> String) -> Result<i64, GenerateError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| GenerateError::Parse {
        value: value.to_string(),
        context: context(),
    })
}

/// Parse a non-negative id that fits the database's id width
pub fn parse_id(value: &Value, context: impl FnOnce() -> String) -> Result<u32, GenerateError> {
    let mut context = Some(context);
    let mut describe = || context.take().map(|c| c()).unwrap_or_default();
    let int = parse_int(value, &mut describe)?;
    u32::try_from(int).map_err(|_| GenerateError::Parse {
        value: value.to_string(),
        context: describe(),
    })
}

/// Records of an upstream table in ascending id order
pub fn entries<'a>(table: &'a Value, name: &'static str) -> Result<Vec<Record<'a>>, GenerateError> {
    let object = table
        .as_object()
        .ok_or(GenerateError::NotATable { table: name })?;

    let mut records = object
        .iter()
        .map(|(key, value)| {
            let id = parse_id(&Value::String(key.clone()), || format!("{} key", name))?;
            Ok(Record {
                table: name,
                id,
                value,
            })
        })
        .collect::<Result<Vec<_>, GenerateError>>()?;
    records.sort_by_key(|r| r.id);
    Ok(records)
}

/// Look up a single record by id
pub fn record<'a>(table: &'a Value, name: &'static str, id: u32) -> Result<Record<'a>, GenerateError> {
    table
        .get(id.to_string())
        .map(|value| Record {
            table: name,
            id,
            value,
        })
        .ok_or(GenerateError::MissingRecord { table: name, id })
}

/// One row of an upstream table
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub table: &'static str,
    pub id: u32,
    pub value: &'a Value,
}

impl<'a> Record<'a> {
    fn context(&self, field: &str) -> String {
        format!("{}.{}.{}", self.table, self.id, field)
    }

    pub fn get(&self, field: &'static str) -> Option<&'a Value> {
        self.value.get(field).filter(|v| !v.is_null())
    }

    pub fn field(&self, field: &'static str) -> Result<&'a Value, GenerateError> {
        self.get(field).ok_or(GenerateError::MissingField {
            table: self.table,
            id: self.id,
            field,
        })
    }

    pub fn int(&self, field: &'static str) -> Result<i64, GenerateError> {
        parse_int(self.field(field)?, || self.context(field))
    }

    pub fn id_field(&self, field: &'static str) -> Result<u32, GenerateError> {
        parse_id(self.field(field)?, || self.context(field))
    }

    /// Ids listed in a field given either as an array or as an object of values
    pub fn ids(&self, field: &'static str) -> Result<Vec<u32>, GenerateError> {
        match self.get(field) {
            Some(value) => list_values(value)
                .ok_or_else(|| GenerateError::Parse {
                    value: value.to_string(),
                    context: self.context(field),
                })?
                .into_iter()
                .map(|v| parse_id(v, || self.context(field)))
                .collect(),
            None => Ok(Vec::new()),
        }
    }
}

/// Values of a JSON array, or of an object in key order
pub fn list_values(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(map) => Some(map.values().collect()),
        _ => None,
    }
}

/// Localized text of one language
pub struct Texts<'a> {
    tables: HashMap<TextTable, &'a Value>,
}

impl<'a> Texts<'a> {
    pub fn new(tables: HashMap<TextTable, &'a Value>) -> Self {
        Self { tables }
    }

    /// Text stored under `"{table}.{id}.{field}"`
    pub fn text(&self, table: TextTable, id: u32, field: u32) -> Result<String, GenerateError> {
        let key = format!("{}.{}.{}", table.name(), id, field);
        self.tables
            .get(&table)
            .and_then(|t| t.get(&key))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(GenerateError::MissingText { key })
    }
}
