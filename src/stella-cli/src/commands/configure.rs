//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up stella CLI defaults.

use crate::cli::GeneratorOverrides;
use crate::config::Config;
use anyhow::{Context, Result};

/// Handle the configure command
pub fn handle(overrides: &GeneratorOverrides, show: bool) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        return show_config(&config);
    }

    if is_empty(overrides) {
        show_usage();
        return Ok(());
    }

    config.apply(overrides);
    config.save()?;
    println!("Configuration updated");
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

fn is_empty(overrides: &GeneratorOverrides) -> bool {
    overrides.data_url.is_none()
        && overrides.asset_url.is_none()
        && overrides.site_url.is_none()
        && overrides.output_dir.is_none()
        && overrides.static_dir.is_none()
        && overrides.languages.is_empty()
        && overrides.max_concurrent_downloads.is_none()
        && overrides.timeout.is_none()
}

/// Display current configuration
fn show_config(config: &Config) -> Result<()> {
    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    print!("{}", text);

    if let Ok(path) = Config::config_path() {
        println!();
        println!("Config file: {}", path.display());
    }

    Ok(())
}

fn show_usage() {
    println!("Usage: stella configure --data-url URL --lang en,jp ...");
    println!("   or: stella configure --show");
}
