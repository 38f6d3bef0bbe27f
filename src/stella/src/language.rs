//! Supported data languages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language the upstream data is published in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Jp,
    Kr,
    Cn,
    Tw,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::En,
        Language::Jp,
        Language::Kr,
        Language::Cn,
        Language::Tw,
    ];

    /// Short code used in output file names (`database_en.json`)
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Jp => "jp",
            Language::Kr => "kr",
            Language::Cn => "cn",
            Language::Tw => "tw",
        }
    }

    /// Upstream region folder holding this language's tables
    pub fn region(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Jp => "JP",
            Language::Kr => "KR",
            Language::Cn => "CN",
            Language::Tw => "TW",
        }
    }

    /// Upstream locale folder for the text tables
    pub fn locale(self) -> &'static str {
        match self {
            Language::En => "en_US",
            Language::Jp => "ja_JP",
            Language::Kr => "ko_KR",
            Language::Cn => "zh_CN",
            Language::Tw => "zh_TW",
        }
    }

    /// File name of this language's generated snapshot
    pub fn database_file(self) -> String {
        format!("database_{}.json", self.code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An unrecognised language code
#[derive(Debug, thiserror::Error)]
#[error("unknown language: {0} (expected one of en, jp, kr, cn, tw)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}
