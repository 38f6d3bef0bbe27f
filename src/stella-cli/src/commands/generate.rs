//! Database generation and asset command handlers

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use stella::generate::{Fetcher, HttpFetcher, LocalFetcher};
use stella::{Database, DatabaseLoader, Generator, GeneratorConfig};

/// Stages to run after the databases are published
#[derive(Debug, Clone, Copy)]
pub struct FollowUp {
    pub assets: bool,
    pub sitemap: bool,
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("assets");
    Ok(pb)
}

fn download_assets<F: Fetcher>(generator: &Generator<F>, database: &Database) -> Result<()> {
    let pb = progress_bar()?;
    let report = generator
        .assets(database, &pb)
        .context("Asset download failed")?;
    println!(
        "Downloaded {} assets into {} folders",
        report.downloaded,
        report.folders.len()
    );
    Ok(())
}

fn run<F: Fetcher>(mut generator: Generator<F>, follow_up: FollowUp) -> Result<()> {
    let published = generator.run()?;
    for path in &published.files {
        println!("Wrote {}", path.display());
    }

    let Some(primary) = published.primary() else {
        return Ok(());
    };

    if follow_up.sitemap {
        let lastmod = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let path = generator.sitemap(primary, &lastmod)?;
        println!("Wrote {}", path.display());
    }
    if follow_up.assets {
        download_assets(&generator, primary)?;
    }
    Ok(())
}

fn offline_fetcher(dir: &Path, config: &GeneratorConfig) -> LocalFetcher {
    LocalFetcher::new(dir, &[config.data_url.as_str(), config.asset_url.as_str()])
}

/// Handle the generate command
pub fn generate(config: GeneratorConfig, offline: Option<&Path>, follow_up: FollowUp) -> Result<()> {
    tracing::info!(
        languages = ?config.languages,
        output = %config.output_dir.display(),
        "generating databases"
    );
    match offline {
        Some(dir) => {
            let fetcher = offline_fetcher(dir, &config);
            run(Generator::new(config, fetcher), follow_up)
        }
        None => run(Generator::http(config), follow_up),
    }
}

fn assets_for<F: Fetcher>(generator: Generator<F>) -> Result<()> {
    let config = generator.config();
    let language = config
        .primary_language()
        .context("No languages configured")?;
    let loader = DatabaseLoader::from_dir(&config.output_dir);
    let database = loader
        .get(language)
        .context("Run `stella generate` first")?;
    download_assets(&generator, &database)
}

/// Handle the assets command: download images for the published primary database
pub fn assets(config: GeneratorConfig, offline: Option<&Path>) -> Result<()> {
    match offline {
        Some(dir) => {
            let fetcher = offline_fetcher(dir, &config);
            assets_for(Generator::new(config, fetcher))
        }
        None => {
            let fetcher = HttpFetcher::new(config.timeout());
            assets_for(Generator::new(config, fetcher))
        }
    }
}
