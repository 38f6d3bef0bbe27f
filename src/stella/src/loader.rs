//! Single-flight snapshot loading
//!
//! Consumers ask for a language's snapshot whenever they need it. The first
//! request loads it; any request that arrives while that load is running
//! waits for it instead of starting a second one. A failed load is not
//! remembered, so the next request tries again.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::database::Database;
use crate::language::Language;
use crate::schema::{conform, ValidationError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} failed validation: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

/// Read and validate a snapshot file
pub fn read_database(path: &Path) -> Result<Database, LoadError> {
    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_slice(&data).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    conform(&value).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

type LoadFn = dyn Fn(Language) -> Result<Database, LoadError> + Send + Sync;
type Slot = Arc<OnceCell<Arc<Database>>>;

/// Lazily loads one snapshot per language, at most once at a time
pub struct DatabaseLoader {
    load: Box<LoadFn>,
    slots: Mutex<HashMap<Language, Slot>>,
}

impl DatabaseLoader {
    pub fn new<F>(load: F) -> Self
    where
        F: Fn(Language) -> Result<Database, LoadError> + Send + Sync + 'static,
    {
        Self {
            load: Box::new(load),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Loader reading `database_{lang}.json` files from `dir`
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::new(move |language| read_database(&dir.join(language.database_file())))
    }

    fn slot(&self, language: Language) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(language).or_default().clone()
    }

    /// The snapshot for `language`, loading it on first use
    pub fn get(&self, language: Language) -> Result<Arc<Database>, LoadError> {
        // The map lock is released before loading so languages load independently
        let slot = self.slot(language);
        slot.get_or_try_init(|| {
            tracing::debug!(%language, "loading database");
            (self.load)(language).map(Arc::new)
        })
        .cloned()
    }

    /// Drop any loaded snapshot for `language` and load it again.
    ///
    /// Holders of the previous snapshot keep their copy.
    pub fn reload(&self, language: Language) -> Result<Arc<Database>, LoadError> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(language, Slot::default());
        self.get(language)
    }

    pub fn is_loaded(&self, language: Language) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&language)
            .is_some_and(|slot| slot.get().is_some())
    }
}
