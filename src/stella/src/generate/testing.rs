//! In-memory upstream used by the generator tests

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::assets::AssetFolder;
use super::fetch::{FetchError, Fetcher};
use super::tables::{BinTable, TextTable};
use super::GeneratorConfig;
use crate::language::Language;

pub const DATA_URL: &str = "https://data.test";
pub const ASSET_URL: &str = "https://assets.test";

/// Serves canned responses keyed by URL; anything else is a 404
#[derive(Default)]
pub struct MapFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: AtomicUsize,
}

impl MapFetcher {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, url: &str, body: Vec<u8>) {
        self.responses.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn insert_json(&self, url: &str, value: &Value) {
        self.insert(url, serde_json::to_vec(value).unwrap());
    }

    pub fn json(&self, url: &str) -> Value {
        serde_json::from_slice(&self.responses.lock().unwrap()[url]).unwrap()
    }

    pub fn remove(&self, url: &str) {
        self.responses.lock().unwrap().remove(url);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were ever served at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Fetcher for MapFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let body = self.responses.lock().unwrap().get(url).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        body.ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

pub fn config() -> GeneratorConfig {
    GeneratorConfig {
        data_url: DATA_URL.into(),
        asset_url: ASSET_URL.into(),
        site_url: "https://site.test".into(),
        ..GeneratorConfig::default()
    }
}

fn bin_tables() -> Vec<(BinTable, Value)> {
    vec![
        (
            BinTable::Character,
            json!({
                "103": {"Id": 103, "Class": 1, "EET": 2, "Grade": 1},
                "112": {"Id": 112, "Class": "3", "EET": "5", "Grade": "2"},
                "150": {"Id": 150, "Class": 2, "EET": 1, "Grade": 1},
                "160": {"Id": 160, "Class": 2, "EET": 3, "Grade": 3}
            }),
        ),
        (
            BinTable::CharPotential,
            json!({
                "103": {
                    "Id": 103,
                    "MasterSpecificPotentialIds": [510301],
                    "AssistSpecificPotentialIds": [510302]
                },
                "112": {
                    "Id": 112,
                    "MasterSpecificPotentialIds": [],
                    "CommonPotentialIds": [511201]
                },
                "150": {"Id": 150, "MasterSpecificPotentialIds": [515001]},
                "160": {"Id": 160, "CommonPotentialIds": [516001]}
            }),
        ),
        (
            BinTable::Potential,
            json!({
                "510301": {
                    "Id": 510301,
                    "CharId": 103,
                    "Build": 1,
                    "Params": [{"Idx": 1, "Values": ["120%", "135%", "150%"]}]
                },
                "510302": {"Id": 510302, "CharId": 103, "Build": 2},
                "511201": {"Id": 511201, "CharId": 112, "Build": 1},
                "515001": {"Id": 515001, "CharId": 150, "Build": 1},
                "516001": {"Id": 516001, "CharId": 160, "Build": 1}
            }),
        ),
        (
            BinTable::Item,
            json!({
                "510301": {"Id": 510301, "Stype": 42, "Rarity": 1},
                "510302": {"Id": 510302, "Stype": 41, "Rarity": 1},
                "511201": {"Id": 511201, "Stype": "41", "Rarity": "2"},
                "515001": {"Id": 515001, "Stype": 42, "Rarity": 1},
                "516001": {"Id": 516001, "Stype": 41, "Rarity": 1}
            }),
        ),
        (
            BinTable::Disc,
            json!({
                "211001": {"Id": 211001, "EET": 4, "Rarity": 1, "SkillIds": [5001]}
            }),
        ),
        (
            BinTable::DiscSkill,
            json!({
                "5001": {
                    "Id": 5001,
                    "Params": [{"Idx": 1, "Values": ["10%", "12%"]}],
                    "Notes": [[[90011, 2]], [[90011, 3]]]
                }
            }),
        ),
    ]
}

fn text_tables(language: Language) -> Vec<(TextTable, Value)> {
    let mut item = serde_json::Map::new();
    let mut potential = serde_json::Map::new();
    for id in [510301, 510302, 511201, 515001] {
        item.insert(format!("Item.{}.1", id), json!(format!("Potential {}", id)));
        potential.insert(format!("Potential.{}.1", id), json!("short"));
        potential.insert(
            format!("Potential.{}.2", id),
            json!(format!("long ({})", language)),
        );
    }

    let mut character = serde_json::Map::new();
    for (id, name) in [(103, "Amber"), (112, "Tilia"), (150, "???")] {
        character.insert(format!("CharacterDes.{}.2", id), json!(name));
        for field in [4, 5, 6, 7, 9, 10, 11, 12] {
            character.insert(
                format!("CharacterDes.{}.{}", id, field),
                json!(format!("build text {}", field)),
            );
        }
    }

    vec![
        (TextTable::Item, Value::Object(item)),
        (TextTable::Potential, Value::Object(potential)),
        (TextTable::CharacterDes, Value::Object(character)),
        (
            TextTable::Disc,
            json!({"Disc.211001.1": "Wind Chime", "Disc.211001.2": "A chime"}),
        ),
        (
            TextTable::DiscSkill,
            json!({"DiscSkill.5001.1": "Gale", "DiscSkill.5001.2": "Deal &Param1& damage"}),
        ),
    ]
}

/// Upstream with two publishable characters, one placeholder character,
/// one incomplete character and one disc, plus every image they reference
pub fn fixture(languages: &[Language]) -> MapFetcher {
    let fetcher = MapFetcher::default();
    for &lang in languages {
        for (table, value) in bin_tables() {
            fetcher.insert_json(&table.url(DATA_URL, lang), &value);
        }
        for (table, value) in text_tables(lang) {
            fetcher.insert_json(&table.url(DATA_URL, lang), &value);
        }
    }

    fetcher.insert_json(
        &AssetFolder::PotentialIcons.index_url(ASSET_URL),
        &json!(["510301.webp", "510302.webp"]),
    );
    fetcher.insert_json(&AssetFolder::Loading.index_url(ASSET_URL), &json!([]));

    for path in [
        "portraits/Amber.webp",
        "portraits/Tilia.webp",
        "discs/211001.webp",
        "notes/note_90011.webp",
        "potential-icons/510301.webp",
        "potential-icons/510302.webp",
    ] {
        fetcher.insert(&format!("{}/{}", ASSET_URL, path), path.as_bytes().to_vec());
    }
    fetcher
}
