//! Shared schema validation
//!
//! Both the shareable build data and the generated database are checked in
//! two layers: strict typed conformance (the shape) followed by the
//! [`Validate`] invariants a type system cannot express. The JSON Schema
//! documents handed to other consumers are generated from the very same
//! type definitions, so the two can never drift apart.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::build::BuildData;
use crate::database::Database;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer-like location, `/` for the document root
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised when a value fails its size gate or schema
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{subject} too large: {size} > {max} bytes")]
    TooLarge {
        subject: &'static str,
        size: usize,
        max: usize,
    },

    #[error("invalid {subject}:\n{}", join_violations(.violations))]
    Schema {
        subject: &'static str,
        violations: Vec<Violation>,
    },
}

impl ValidationError {
    /// Violations carried by a schema failure (empty for size failures)
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Schema { violations, .. } => violations,
            Self::TooLarge { .. } => &[],
        }
    }
}

/// Invariants checked after a value has the right shape
pub trait Validate {
    /// Human-readable name used in error messages
    const SUBJECT: &'static str;

    /// Collect every invariant violation (empty when valid)
    fn violations(&self) -> Vec<Violation>;

    /// Fail with a [`ValidationError::Schema`] when any invariant is broken
    fn validate(&self) -> Result<(), ValidationError> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Schema {
                subject: Self::SUBJECT,
                violations,
            })
        }
    }
}

/// Check a raw JSON document against `T`: typed shape first, then invariants.
pub fn conform<T>(value: &Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let typed = T::deserialize(value).map_err(|e| ValidationError::Schema {
        subject: T::SUBJECT,
        violations: vec![Violation::new("/", e.to_string())],
    })?;
    typed.validate()?;
    Ok(typed)
}

/// Generate the JSON Schema document for `T`
pub fn json_schema<T: JsonSchema>() -> Value {
    let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
    // RootSchema only holds maps, strings and numbers
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

/// File names of the emitted schema documents
pub const BUILD_DATA_SCHEMA_FILE: &str = "buildData.schema.json";
pub const DATABASE_SCHEMA_FILE: &str = "database.schema.json";

/// Write both schema documents into `dir`, returning the written paths
pub fn write_schemas(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let documents = [
        (BUILD_DATA_SCHEMA_FILE, json_schema::<BuildData>()),
        (DATABASE_SCHEMA_FILE, json_schema::<Database>()),
    ];

    let mut written = Vec::with_capacity(documents.len());
    for (name, schema) in documents {
        let path = dir.join(name);
        let text = serde_json::to_string_pretty(&schema)?;
        std::fs::write(&path, text + "\n")?;
        written.push(path);
    }
    Ok(written)
}
