//! Generator setting overrides shared by several commands

use clap::Args;
use std::path::PathBuf;

/// Flags that take precedence over the configuration file
#[derive(Args, Debug, Default, Clone)]
pub struct GeneratorOverrides {
    /// Origin of the raw game tables
    #[arg(long, env = "STELLA_DATA_URL")]
    pub data_url: Option<String>,

    /// Origin of the image assets
    #[arg(long, env = "STELLA_ASSET_URL")]
    pub asset_url: Option<String>,

    /// Public site URL used in the sitemap
    #[arg(long)]
    pub site_url: Option<String>,

    /// Directory receiving database_{lang}.json
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Static site root receiving assets and sitemap.xml
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Languages to generate, first one is primary (repeatable or comma separated)
    #[arg(short, long = "lang", value_delimiter = ',')]
    pub languages: Vec<stella::Language>,

    /// Maximum simultaneous asset downloads
    #[arg(long)]
    pub max_concurrent_downloads: Option<usize>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
