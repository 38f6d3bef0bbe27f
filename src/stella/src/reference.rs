//! Reference enumerations for Stella Sora game data
//!
//! Every enumeration here is stored as its numeric game code on the wire
//! (`"class": 2`), so the JSON emitted by the generator matches the tables
//! it was built from and the page layer can index color tables by code.

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric code that does not name any variant of a reference enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: i64,
}

/// Declare a code-backed enumeration with lookup helpers, serde and schema support.
macro_rules! numeric_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "u8")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code ),+
        }

        impl $name {
            /// All variants in code order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Numeric game code
            pub fn code(self) -> u8 {
                self as u8
            }

            /// Display name
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Look up a variant by its numeric game code
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl TryFrom<i64> for $name {
            type Error = UnknownCode;

            fn try_from(code: i64) -> Result<Self, UnknownCode> {
                Self::from_code(code).ok_or(UnknownCode {
                    kind: stringify!($name),
                    code,
                })
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_owned()
            }

            fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
                SchemaObject {
                    instance_type: Some(InstanceType::Integer.into()),
                    enum_values: Some(vec![$(serde_json::Value::from($code)),+]),
                    ..Default::default()
                }
                .into()
            }
        }
    };
}

numeric_enum! {
    /// Character rarity (the upstream `Grade` column)
    Rarity {
        Ssr = 1 => "SSR",
        Sr = 2 => "SR",
        R = 3 => "R",
    }
}

numeric_enum! {
    /// Character combat class
    CharacterClass {
        Vanguard = 1 => "Vanguard",
        Versatile = 2 => "Versatile",
        Support = 3 => "Support",
    }
}

numeric_enum! {
    /// Elemental affinity (the upstream `EET` column)
    Element {
        Aqua = 1 => "Aqua",
        Ignis = 2 => "Ignis",
        Terra = 3 => "Terra",
        Ventus = 4 => "Ventus",
        Lux = 5 => "Lux",
        Umbra = 6 => "Umbra",
        /// Discs without an elemental bias
        None = 7 => "None",
    }
}

numeric_enum! {
    /// Potential rarity, derived from the item table's `Stype`/`Rarity` pair
    PotentialRarity {
        Common = 1 => "Common",
        Rare = 2 => "Rare",
        Main = 3 => "Main",
    }
}

numeric_enum! {
    /// Which build role a potential is offered in
    PotentialType {
        /// Main-slot potentials (master specific + master normal)
        Main = 1 => "Main",
        /// Support-slot potentials (assist specific + assist normal)
        Assist = 2 => "Assist",
        /// Offered in either role
        Common = 3 => "Common",
    }
}

/// Item table `Stype` for character-specific (main) potentials
pub const STYPE_SPECIFIC_POTENTIAL: i64 = 42;

/// Item table `Stype` for rare/common potentials, split by `Rarity`
pub const STYPE_POTENTIAL: i64 = 41;

/// Classify a potential's rarity from its item record.
///
/// The mapping is exhaustive: any other combination means upstream changed
/// shape and is reported as `None`.
pub fn potential_rarity(stype: i64, rarity: i64) -> Option<PotentialRarity> {
    match (stype, rarity) {
        (STYPE_SPECIFIC_POTENTIAL, _) => Some(PotentialRarity::Main),
        (STYPE_POTENTIAL, 1) => Some(PotentialRarity::Rare),
        (STYPE_POTENTIAL, 2) => Some(PotentialRarity::Common),
        _ => None,
    }
}

/// Display name the upstream text tables use for unreleased entities
pub const PLACEHOLDER_NAME: &str = "???";
