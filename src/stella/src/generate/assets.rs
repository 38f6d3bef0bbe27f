//! Image asset download
//!
//! Runs after a snapshot is published. Every image the snapshot references
//! is pulled from the asset origin (`{asset_url}/{folder}/{name}`) on a
//! bounded pool and written under a file name derived from the entity's
//! stable id, so renames upstream never orphan a file.
//!
//! Each folder is filled in a staging directory first and only swapped into
//! place once every download of the stage has succeeded. The swap covers
//! all folders or none: a folder that cannot be swapped puts the ones
//! already swapped back to their previous contents.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::fetch::Fetcher;
use super::{io_error, replace_all, Entry, GenerateError};
use crate::database::Database;

/// Asset origin folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetFolder {
    Portraits,
    Discs,
    PotentialIcons,
    Loading,
    Notes,
}

impl AssetFolder {
    pub fn name(self) -> &'static str {
        match self {
            AssetFolder::Portraits => "portraits",
            AssetFolder::Discs => "discs",
            AssetFolder::PotentialIcons => "potential-icons",
            AssetFolder::Loading => "loading",
            AssetFolder::Notes => "notes",
        }
    }

    /// URL of the folder's listing of available files
    pub fn index_url(self, asset_url: &str) -> String {
        format!("{}/{}/index.json", asset_url.trim_end_matches('/'), self.name())
    }
}

/// One file to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetJob {
    pub folder: AssetFolder,
    /// URL path segment on the asset origin (already percent-encoded)
    pub source: String,
    /// File name written locally
    pub file: String,
}

impl AssetJob {
    fn same_name(folder: AssetFolder, name: String) -> Self {
        Self {
            folder,
            source: urlencoding::encode(&name).into_owned(),
            file: name,
        }
    }

    pub fn url(&self, asset_url: &str) -> String {
        format!(
            "{}/{}/{}",
            asset_url.trim_end_matches('/'),
            self.folder.name(),
            self.source
        )
    }
}

/// Reject names that could leave their folder
fn safe_file_name(name: &str) -> Result<(), GenerateError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':', '\0']);
    if unsafe_name {
        return Err(GenerateError::UnsafeAssetName(name.to_string()));
    }
    Ok(())
}

/// Every image a snapshot references
pub fn plan(database: &Database) -> Result<Vec<AssetJob>, GenerateError> {
    let mut jobs = Vec::new();

    // Portraits are published by display name upstream but stored by id
    for character in &database.characters {
        jobs.push(AssetJob {
            folder: AssetFolder::Portraits,
            source: urlencoding::encode(&format!("{}.webp", character.name)).into_owned(),
            file: format!("{}.webp", character.id),
        });
    }
    for disc in &database.discs {
        jobs.push(AssetJob::same_name(
            AssetFolder::Discs,
            format!("{}.webp", disc.id),
        ));
    }
    for note in database.note_ids() {
        jobs.push(AssetJob::same_name(
            AssetFolder::Notes,
            format!("note_{}.webp", note),
        ));
    }
    for (folder, names) in [
        (AssetFolder::PotentialIcons, &database.potential_icons),
        (AssetFolder::Loading, &database.loading),
    ] {
        for name in names {
            safe_file_name(name)?;
            jobs.push(AssetJob::same_name(folder, name.clone()));
        }
    }

    Ok(jobs)
}

/// Result of a completed asset stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub downloaded: usize,
    pub folders: Vec<PathBuf>,
}

fn staging_dir(static_dir: &Path, folder: AssetFolder) -> PathBuf {
    static_dir.join(format!(".{}.staging", folder.name()))
}

/// Download `jobs` with at most `max_concurrent` requests in flight.
///
/// `progress` is advanced once per finished file; it is informational only.
pub fn download<F: Fetcher + ?Sized>(
    fetcher: &F,
    asset_url: &str,
    static_dir: &Path,
    jobs: &[AssetJob],
    max_concurrent: usize,
    progress: &ProgressBar,
) -> Result<AssetReport, GenerateError> {
    let folders: BTreeSet<AssetFolder> = jobs.iter().map(|j| j.folder).collect();

    for folder in &folders {
        let staging = staging_dir(static_dir, *folder);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(io_error(&staging))?;
        }
        fs::create_dir_all(&staging).map_err(io_error(&staging))?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_concurrent.max(1))
        .thread_name(|i| format!("asset-download-{}", i))
        .build()?;

    progress.set_length(jobs.len() as u64);
    tracing::info!(
        files = jobs.len(),
        folders = folders.len(),
        max_concurrent,
        "downloading assets"
    );

    let result = pool.install(|| {
        jobs.par_iter().try_for_each(|job| {
            let bytes = fetcher.fetch_bytes(&job.url(asset_url))?;
            let path = staging_dir(static_dir, job.folder).join(&job.file);
            fs::write(&path, bytes).map_err(io_error(&path))?;
            progress.inc(1);
            Ok::<(), GenerateError>(())
        })
    });

    if let Err(e) = result {
        for folder in &folders {
            let _ = fs::remove_dir_all(staging_dir(static_dir, *folder));
        }
        return Err(e);
    }

    let staged = folders
        .iter()
        .map(|folder| (staging_dir(static_dir, *folder), static_dir.join(folder.name())))
        .collect();
    let published = replace_all(Entry::Dir, staged)?;

    progress.finish_and_clear();
    Ok(AssetReport {
        downloaded: jobs.len(),
        folders: published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::{character, potential};
    use crate::database::{Disc, DiscSkill};
    use crate::generate::testing::MapFetcher;
    use crate::reference::{Element, PotentialType};

    fn database() -> Database {
        Database {
            characters: vec![character(103, "Chitose Ai", vec![potential(1, PotentialType::Main)])],
            discs: vec![Disc {
                id: 211001,
                name: "Wind Chime".into(),
                desc: String::new(),
                element: Element::Ventus,
                rarity: 1,
                skills: vec![DiscSkill {
                    name: String::new(),
                    desc: String::new(),
                    params: Vec::new(),
                    notes: vec![vec![(90011, 2)]],
                }],
            }],
            potential_icons: vec!["icon_a.webp".into()],
            loading: Vec::new(),
        }
    }

    #[test]
    fn test_plan_uses_stable_ids() {
        let jobs = plan(&database()).unwrap();
        let summary: Vec<(&str, &str, &str)> = jobs
            .iter()
            .map(|j| (j.folder.name(), j.source.as_str(), j.file.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("portraits", "Chitose%20Ai.webp", "103.webp"),
                ("discs", "211001.webp", "211001.webp"),
                ("notes", "note_90011.webp", "note_90011.webp"),
                ("potential-icons", "icon_a.webp", "icon_a.webp"),
            ]
        );
        assert_eq!(
            jobs[0].url("https://img.example/"),
            "https://img.example/portraits/Chitose%20Ai.webp"
        );
    }

    #[test]
    fn test_plan_rejects_escaping_names() {
        let mut db = database();
        db.loading = vec!["../../etc/passwd".into()];
        assert!(matches!(plan(&db), Err(GenerateError::UnsafeAssetName(_))));
    }

    #[test]
    fn test_download_swaps_folders() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("portraits/old.webp");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();

        let jobs = plan(&database()).unwrap();
        let fetcher = MapFetcher::default();
        for job in &jobs {
            fetcher.insert(&job.url("https://img"), job.file.as_bytes().to_vec());
        }

        let report = download(&fetcher, "https://img", dir.path(), &jobs, 2, &ProgressBar::hidden())
            .unwrap();
        assert_eq!(report.downloaded, 4);
        assert_eq!(report.folders.len(), 4);
        assert_eq!(fs::read(dir.path().join("portraits/103.webp")).unwrap(), b"103.webp");
        assert!(dir.path().join("notes/note_90011.webp").exists());
        assert!(!stale.exists());
        assert!(!staging_dir(dir.path(), AssetFolder::Portraits).exists());
    }

    #[test]
    fn test_download_failure_leaves_previous_assets() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("discs/211001.webp");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"previous").unwrap();

        let jobs = plan(&database()).unwrap();
        let fetcher = MapFetcher::default();
        // everything but the disc cover is available
        for job in jobs.iter().filter(|j| j.folder != AssetFolder::Discs) {
            fetcher.insert(&job.url("https://img"), vec![1]);
        }

        let err = download(&fetcher, "https://img", dir.path(), &jobs, 3, &ProgressBar::hidden())
            .unwrap_err();
        assert!(matches!(err, GenerateError::Fetch(_)));
        assert_eq!(fs::read(&existing).unwrap(), b"previous");
        assert!(!dir.path().join("portraits").exists());
        assert!(!staging_dir(dir.path(), AssetFolder::Discs).exists());
    }

    #[test]
    fn test_failed_swap_restores_swapped_folders() {
        let dir = tempfile::tempdir().unwrap();
        let portrait = dir.path().join("portraits/103.webp");
        fs::create_dir_all(portrait.parent().unwrap()).unwrap();
        fs::write(&portrait, b"previous").unwrap();
        // a stray file where the discs folder belongs
        fs::write(dir.path().join("discs"), b"not a folder").unwrap();

        let jobs = plan(&database()).unwrap();
        let fetcher = MapFetcher::default();
        for job in &jobs {
            fetcher.insert(&job.url("https://img"), vec![1]);
        }

        let err = download(&fetcher, "https://img", dir.path(), &jobs, 2, &ProgressBar::hidden())
            .unwrap_err();
        assert!(matches!(err, GenerateError::Io { .. }));
        assert_eq!(fs::read(&portrait).unwrap(), b"previous");
        assert!(!dir.path().join("notes").exists());
        for folder in [AssetFolder::Portraits, AssetFolder::Discs, AssetFolder::Notes] {
            assert!(!staging_dir(dir.path(), folder).exists());
        }
        assert!(!dir.path().join(".portraits.bak").exists());
    }

    #[test]
    fn test_download_respects_concurrency_limit() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<AssetJob> = (0..24)
            .map(|i| AssetJob::same_name(AssetFolder::Loading, format!("{}.webp", i)))
            .collect();
        let fetcher = MapFetcher::default().with_delay(std::time::Duration::from_millis(5));
        for job in &jobs {
            fetcher.insert(&job.url("https://img"), vec![0]);
        }

        download(&fetcher, "https://img", dir.path(), &jobs, 3, &ProgressBar::hidden()).unwrap();
        assert!(fetcher.max_in_flight() <= 3);
        assert_eq!(fetcher.requests(), 24);
    }
}
