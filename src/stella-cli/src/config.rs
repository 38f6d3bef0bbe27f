//! Configuration management for stella CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stella::GeneratorConfig;

use crate::cli::GeneratorOverrides;

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("stella");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Apply command-line flags on top of the stored settings
    pub fn apply(&mut self, overrides: &GeneratorOverrides) {
        let generator = &mut self.generator;
        if let Some(url) = &overrides.data_url {
            generator.data_url = url.clone();
        }
        if let Some(url) = &overrides.asset_url {
            generator.asset_url = url.clone();
        }
        if let Some(url) = &overrides.site_url {
            generator.site_url = url.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            generator.output_dir = dir.clone();
        }
        if let Some(dir) = &overrides.static_dir {
            generator.static_dir = dir.clone();
        }
        if !overrides.languages.is_empty() {
            generator.languages = overrides.languages.clone();
        }
        if let Some(max) = overrides.max_concurrent_downloads {
            generator.max_concurrent_downloads = max;
        }
        if let Some(secs) = overrides.timeout {
            generator.timeout_secs = secs;
        }
    }

    /// Stored settings with `overrides` applied
    pub fn generator(mut self, overrides: &GeneratorOverrides) -> GeneratorConfig {
        self.apply(overrides);
        self.generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stella::Language;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.generator.languages.len(), 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.generator.languages = vec![Language::Jp, Language::En];
        config.generator.max_concurrent_downloads = 2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[generator]\ntimeout_secs = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.generator.timeout_secs, 5);
        assert_eq!(config.generator.max_concurrent_downloads, 8);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.generator.site_url = "https://stored.example".into();
        config.generator.timeout_secs = 10;

        let overrides = GeneratorOverrides {
            data_url: Some("https://mirror.example".into()),
            languages: vec![Language::Kr],
            timeout: Some(60),
            ..Default::default()
        };
        let generator = config.generator(&overrides);
        assert_eq!(generator.data_url, "https://mirror.example");
        assert_eq!(generator.site_url, "https://stored.example");
        assert_eq!(generator.languages, vec![Language::Kr]);
        assert_eq!(generator.timeout_secs, 60);
    }
}
