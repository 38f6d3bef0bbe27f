//! # stella
//!
//! Stella Sora build planner core: shareable build tokens and the game
//! database they refer to.
//!
//! This library provides functionality to:
//! - Encode and decode builds to compact URL-safe tokens
//! - Validate builds and database snapshots, and emit their JSON Schemas
//! - Generate per-language database snapshots from the upstream game tables
//! - Load generated snapshots on demand
//!
//! ## Example
//!
//! ```
//! use stella::{decode, encode, BuildData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let build = BuildData {
//!     name: "Amber main".into(),
//!     main_id: Some(103),
//!     potential_ids: vec![510301, 510302],
//!     ..Default::default()
//! };
//!
//! let token = encode(&build)?;
//! assert_eq!(decode(&token)?, build);
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod codec;
pub mod database;
pub mod language;
pub mod loader;
pub mod reference;
pub mod schema;

#[cfg(feature = "generate")]
pub mod generate;

#[cfg(feature = "wasm")]
pub mod wasm;

#[doc(inline)]
pub use build::{BuildData, PotentialConfig, MAX_BUILD_JSON_LEN};
#[doc(inline)]
pub use codec::{decode, encode, validate, validate_json, DecodeFailure, InvalidBuildData};
#[doc(inline)]
pub use database::{Character, Database, Disc, DiscSkill, Potential};
#[doc(inline)]
pub use language::{Language, UnknownLanguage};
#[doc(inline)]
pub use loader::{DatabaseLoader, LoadError};
#[doc(inline)]
pub use schema::{Validate, ValidationError, Violation};

// Reference data (rarities, classes, elements, potential kinds)
#[doc(inline)]
pub use reference::{CharacterClass, Element, PotentialRarity, PotentialType, Rarity};

#[cfg(feature = "generate")]
#[doc(inline)]
pub use generate::{Aborted, GenerateError, Generator, GeneratorConfig, Published, Stage};
