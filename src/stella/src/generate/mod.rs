//! Database generation pipeline
//!
//! A run fetches every upstream table for every configured language,
//! reconstructs which potentials belong to which character and build slot,
//! assembles one [`Database`] per language and validates it. Snapshots are
//! written only once every language has validated, so a failed run never
//! leaves a partial set of files behind.
//!
//! ```text
//! Fetching -> CrossReferencing -> Assembling -> Validating -> Published
//!     \              \                 \             \
//!      +--------------+-----------------+-------------+--> Aborted
//! ```
//!
//! Image assets and the sitemap are follow-up stages driven by a published
//! snapshot; see [`Generator::assets`] and [`Generator::sitemap`].

pub mod assemble;
pub mod assets;
pub mod fetch;
pub mod potentials;
pub mod sitemap;
pub mod tables;

#[cfg(test)]
pub(crate) mod testing;

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::Database;
use crate::language::Language;
use crate::schema::{conform, ValidationError};

pub use assets::{AssetFolder, AssetJob, AssetReport};
pub use fetch::{FetchError, Fetcher, HttpFetcher, LocalFetcher};
use potentials::CrossReference;
use tables::{list_values, BinTable, TextTable, Texts};

/// Errors that abort a generator run
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to parse integer: {value} ({context})")]
    Parse { value: String, context: String },

    #[error("{table} is not a table of records")]
    NotATable { table: &'static str },

    #[error("{table} has no record {id}")]
    MissingRecord { table: &'static str, id: u32 },

    #[error("{table}.{id} has no {field} field")]
    MissingField {
        table: &'static str,
        id: u32,
        field: &'static str,
    },

    #[error("missing text {key}")]
    MissingText { key: String },

    #[error("potential {potential_id} has unknown type (Stype {stype}, Rarity {rarity})")]
    UnknownPotentialType {
        potential_id: u32,
        stype: i64,
        rarity: i64,
    },

    #[error("potential {potential_id} is not offered to character {character_id}")]
    UnknownPotentialClassification { character_id: u32, potential_id: u32 },

    #[error("{resource} was not fetched")]
    NotFetched { resource: String },

    #[error("no languages configured")]
    NoLanguages,

    #[error("database_{language}.json failed validation: {source}")]
    InvalidDatabase {
        language: Language,
        #[source]
        source: ValidationError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("refusing unsafe asset name {0:?}")]
    UnsafeAssetName(String),

    #[error("failed to start download pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Generator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Origin of the raw game tables
    pub data_url: String,
    /// Origin of the image assets
    pub asset_url: String,
    /// Public URL of the site, used for the sitemap
    pub site_url: String,
    /// Where `database_{lang}.json` files are written
    pub output_dir: PathBuf,
    /// Root of the static site; asset folders and `sitemap.xml` go here
    pub static_dir: PathBuf,
    /// Languages to generate; the first one drives assets and the sitemap
    pub languages: Vec<Language>,
    pub max_concurrent_downloads: usize,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            data_url: "https://raw.githubusercontent.com/stellabuilds/StellaSoraData/main".into(),
            asset_url: "https://raw.githubusercontent.com/stellabuilds/stella-assets/main".into(),
            site_url: "https://stellabuilds.app".into(),
            output_dir: PathBuf::from("static/databases"),
            static_dir: PathBuf::from("static"),
            languages: Language::ALL.to_vec(),
            max_concurrent_downloads: 8,
            timeout_secs: 30,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Language whose snapshot drives assets and the sitemap
    pub fn primary_language(&self) -> Option<Language> {
        self.languages.first().copied()
    }
}

/// Pipeline stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    CrossReferencing,
    Assembling,
    Validating,
    Published,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::CrossReferencing => "cross-referencing",
            Stage::Assembling => "assembling",
            Stage::Validating => "validating",
            Stage::Published => "publishing",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A run that stopped before publishing anything
#[derive(Debug, thiserror::Error)]
#[error("generation aborted while {stage}: {source}")]
pub struct Aborted {
    /// Stage the failure happened in
    pub stage: Stage,
    #[source]
    pub source: GenerateError,
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct Published {
    /// Snapshots in configured language order
    pub databases: Vec<(Language, Database)>,
    pub files: Vec<PathBuf>,
}

impl Published {
    /// Snapshot of the first configured language
    pub fn primary(&self) -> Option<&Database> {
        self.databases.first().map(|(_, db)| db)
    }
}

/// An upstream document a run depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Resource {
    Bin(Language, BinTable),
    Text(Language, TextTable),
    AssetIndex(AssetFolder),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Bin(lang, table) => write!(f, "{}/bin/{}", lang.region(), table.name()),
            Resource::Text(lang, table) => {
                write!(f, "{}/language/{}/{}", lang.region(), lang.locale(), table.name())
            }
            Resource::AssetIndex(folder) => write!(f, "{}/index.json", folder.name()),
        }
    }
}

/// Asset folders whose contents are listed by an index document
const INDEXED_FOLDERS: [AssetFolder; 2] = [AssetFolder::PotentialIcons, AssetFolder::Loading];

/// Everything fetched for one run
struct Documents(HashMap<Resource, Value>);

impl Documents {
    fn get(&self, resource: Resource) -> Result<&Value, GenerateError> {
        self.0.get(&resource).ok_or_else(|| GenerateError::NotFetched {
            resource: resource.to_string(),
        })
    }

    fn bin(&self, language: Language, table: BinTable) -> Result<&Value, GenerateError> {
        self.get(Resource::Bin(language, table))
    }

    fn texts(&self, language: Language) -> Result<Texts<'_>, GenerateError> {
        let tables = TextTable::ALL
            .iter()
            .map(|&table| Ok((table, self.get(Resource::Text(language, table))?)))
            .collect::<Result<HashMap<_, _>, GenerateError>>()?;
        Ok(Texts::new(tables))
    }

    /// File names listed by an asset folder's index
    fn index(&self, folder: AssetFolder) -> Result<Vec<String>, GenerateError> {
        let value = self.get(Resource::AssetIndex(folder))?;
        let malformed = |v: &Value| GenerateError::Parse {
            value: v.to_string(),
            context: format!("{}/index.json", folder.name()),
        };
        list_values(value)
            .ok_or_else(|| malformed(value))?
            .into_iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(|| malformed(v)))
            .collect()
    }
}

/// Runs the pipeline against a [`Fetcher`]
pub struct Generator<F: Fetcher> {
    config: GeneratorConfig,
    fetcher: F,
    stage: Stage,
}

impl Generator<HttpFetcher> {
    /// Generator pulling from the live origins
    pub fn http(config: GeneratorConfig) -> Self {
        let fetcher = HttpFetcher::new(config.timeout());
        Self::new(config, fetcher)
    }
}

impl<F: Fetcher> Generator<F> {
    pub fn new(config: GeneratorConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            stage: Stage::Fetching,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Current (or final) stage of the last run
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run one stage; a failure moves the run to [`Stage::Aborted`]
    fn step<T>(
        &mut self,
        stage: Stage,
        work: impl FnOnce(&Self) -> Result<T, GenerateError>,
    ) -> Result<T, Aborted> {
        self.stage = stage;
        tracing::info!(%stage, "stage started");
        work(self).map_err(|source| {
            tracing::error!(%stage, error = %source, "generation aborted");
            self.stage = Stage::Aborted;
            Aborted { stage, source }
        })
    }

    /// Generate, validate and publish every configured language
    pub fn run(&mut self) -> Result<Published, Aborted> {
        let documents = self.step(Stage::Fetching, Self::fetch)?;

        let xrefs = self.step(Stage::CrossReferencing, |g| {
            g.config
                .languages
                .iter()
                .map(|&lang| {
                    let table = documents.bin(lang, BinTable::CharPotential)?;
                    Ok((lang, potentials::cross_reference(table)?))
                })
                .collect::<Result<BTreeMap<_, _>, GenerateError>>()
        })?;

        let databases = self.step(Stage::Assembling, |g| {
            g.config
                .languages
                .iter()
                .map(|&lang| {
                    let xref = xrefs.get(&lang).ok_or_else(|| GenerateError::NotFetched {
                        resource: Resource::Bin(lang, BinTable::CharPotential).to_string(),
                    })?;
                    Ok((lang, assemble_language(&documents, lang, xref)?))
                })
                .collect::<Result<Vec<_>, GenerateError>>()
        })?;

        self.step(Stage::Validating, |_| {
            for (language, database) in &databases {
                validate_database(*language, database)?;
                tracing::info!(
                    %language,
                    characters = database.characters.len(),
                    discs = database.discs.len(),
                    "snapshot valid"
                );
            }
            Ok(())
        })?;

        let files = self.step(Stage::Published, |g| {
            write_snapshots(&g.config.output_dir, &databases)
        })?;
        tracing::info!(files = files.len(), "databases published");

        Ok(Published { databases, files })
    }

    fn fetch(&self) -> Result<Documents, GenerateError> {
        if self.config.languages.is_empty() {
            return Err(GenerateError::NoLanguages);
        }

        let data_url = &self.config.data_url;
        let mut resources = Vec::new();
        for &lang in &self.config.languages {
            for &table in BinTable::ALL {
                resources.push((Resource::Bin(lang, table), table.url(data_url, lang)));
            }
            for &table in TextTable::ALL {
                resources.push((Resource::Text(lang, table), table.url(data_url, lang)));
            }
        }
        for folder in INDEXED_FOLDERS {
            resources.push((
                Resource::AssetIndex(folder),
                folder.index_url(&self.config.asset_url),
            ));
        }

        tracing::info!(resources = resources.len(), "fetching upstream tables");
        Ok(Documents(fetch::fetch_all(&self.fetcher, &resources)?))
    }

    /// Download every image `database` references into the static directory
    pub fn assets(
        &self,
        database: &Database,
        progress: &ProgressBar,
    ) -> Result<AssetReport, GenerateError> {
        let jobs = assets::plan(database)?;
        assets::download(
            &self.fetcher,
            &self.config.asset_url,
            &self.config.static_dir,
            &jobs,
            self.config.max_concurrent_downloads,
            progress,
        )
    }

    /// Write `sitemap.xml` for `database` into the static directory
    pub fn sitemap(&self, database: &Database, lastmod: &str) -> Result<PathBuf, GenerateError> {
        let xml = sitemap::sitemap(&self.config.site_url, database, lastmod);
        let path = self.config.static_dir.join(sitemap::SITEMAP_FILE);
        write_atomic(&path, xml.as_bytes())?;
        tracing::info!(path = %path.display(), "sitemap written");
        Ok(path)
    }
}

fn assemble_language(
    documents: &Documents,
    language: Language,
    xref: &CrossReference,
) -> Result<Database, GenerateError> {
    tracing::debug!(%language, "assembling snapshot");
    let texts = documents.texts(language)?;

    let attributed = potentials::attribute(
        xref,
        documents.bin(language, BinTable::Potential)?,
        documents.bin(language, BinTable::Item)?,
        &texts,
    )?;
    let characters = assemble::characters(
        documents.bin(language, BinTable::Character)?,
        attributed,
        &texts,
    )?;
    let discs = assemble::discs(
        documents.bin(language, BinTable::Disc)?,
        documents.bin(language, BinTable::DiscSkill)?,
        &texts,
    )?;

    Ok(Database {
        characters,
        discs,
        potential_icons: documents.index(AssetFolder::PotentialIcons)?,
        loading: documents.index(AssetFolder::Loading)?,
    })
}

/// Check a snapshot exactly the way a consumer reading it back would
fn validate_database(language: Language, database: &Database) -> Result<(), GenerateError> {
    let value = serde_json::to_value(database)?;
    conform::<Database>(&value)
        .map(drop)
        .map_err(|source| GenerateError::InvalidDatabase { language, source })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let temp = temp_path(path);
    fs::write(&temp, contents).map_err(io_error(&temp))?;
    fs::rename(&temp, path).map_err(io_error(path))
}

/// Write every snapshot to a temporary file, then rename them all into place
fn write_snapshots(
    output_dir: &Path,
    databases: &[(Language, Database)],
) -> Result<Vec<PathBuf>, GenerateError> {
    fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;

    let mut staged = Vec::with_capacity(databases.len());
    let result = (|| {
        for (language, database) in databases {
            let path = output_dir.join(language.database_file());
            let temp = temp_path(&path);
            let json = serde_json::to_vec_pretty(database)?;
            fs::write(&temp, json).map_err(io_error(&temp))?;
            staged.push((temp, path));
        }
        Ok::<(), GenerateError>(())
    })();

    if let Err(e) = result {
        for (temp, _) in &staged {
            let _ = fs::remove_file(temp);
        }
        return Err(e);
    }

    replace_all(Entry::File, staged)
}

/// What a staged replacement moves into place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    File,
    Dir,
}

impl Entry {
    fn remove(self, path: &Path) -> std::io::Result<()> {
        match self {
            Entry::File => fs::remove_file(path),
            Entry::Dir => fs::remove_dir_all(path),
        }
    }

    /// Whether something of the other kind sits at `path`
    fn blocked(self, path: &Path) -> bool {
        match self {
            Entry::File => path.is_dir(),
            Entry::Dir => path.is_file(),
        }
    }
}

/// Hidden sibling an existing target is moved to while it is replaced
fn backup_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".bak");
    path.with_file_name(name)
}

struct Replacement {
    staged: PathBuf,
    target: PathBuf,
    backup: Option<PathBuf>,
    installed: bool,
}

impl Replacement {
    fn install(&mut self, entry: Entry) -> Result<(), GenerateError> {
        if entry.blocked(&self.target) {
            return Err(GenerateError::Io {
                path: self.target.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "target is occupied by an entry of another kind",
                ),
            });
        }
        if self.target.exists() {
            let backup = backup_path(&self.target);
            if backup.exists() {
                entry.remove(&backup).map_err(io_error(&backup))?;
            }
            fs::rename(&self.target, &backup).map_err(io_error(&self.target))?;
            self.backup = Some(backup);
        }
        fs::rename(&self.staged, &self.target).map_err(io_error(&self.target))?;
        self.installed = true;
        Ok(())
    }

    /// Put the target back the way it was; best effort
    fn roll_back(&self, entry: Entry) {
        if self.installed {
            if let Err(e) = entry.remove(&self.target) {
                tracing::warn!(path = %self.target.display(), error = %e, "failed to remove replacement");
            }
        } else if self.staged.exists() {
            let _ = entry.remove(&self.staged);
        }
        if let Some(backup) = &self.backup {
            if let Err(e) = fs::rename(backup, &self.target) {
                tracing::warn!(path = %self.target.display(), error = %e, "failed to restore previous version");
            }
        }
    }
}

/// Move every staged `(staged, target)` entry into place, or none of them.
///
/// Existing targets are moved aside first. If any move fails, the targets
/// already replaced get their previous version back and every staged entry
/// is removed.
pub(crate) fn replace_all(
    entry: Entry,
    staged: Vec<(PathBuf, PathBuf)>,
) -> Result<Vec<PathBuf>, GenerateError> {
    let mut replacements: Vec<Replacement> = staged
        .into_iter()
        .map(|(staged, target)| Replacement {
            staged,
            target,
            backup: None,
            installed: false,
        })
        .collect();

    let result = replacements.iter_mut().try_for_each(|r| r.install(entry));
    if let Err(e) = result {
        for replacement in replacements.iter().rev() {
            replacement.roll_back(entry);
        }
        return Err(e);
    }

    let mut targets = Vec::with_capacity(replacements.len());
    for replacement in replacements {
        if let Some(backup) = &replacement.backup {
            if let Err(e) = entry.remove(backup) {
                tracing::warn!(path = %backup.display(), error = %e, "failed to remove previous version");
            }
        }
        tracing::debug!(path = %replacement.target.display(), "published");
        targets.push(replacement.target);
    }
    Ok(targets)
}
