//! Core CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::build::BuildCommand;
use super::generate::GeneratorOverrides;

#[derive(Parser)]
#[command(name = "stella")]
#[command(about = "Stella Sora build tokens and database generator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build token operations (encode, decode, validate, show)
    #[command(visible_alias = "b")]
    Build {
        #[command(subcommand)]
        command: BuildCommand,
    },

    /// Generate per-language databases from the upstream tables
    #[command(visible_alias = "g")]
    Generate {
        /// Skip downloading image assets after publishing
        #[arg(long)]
        no_assets: bool,

        /// Skip writing sitemap.xml after publishing
        #[arg(long)]
        no_sitemap: bool,

        /// Read upstream from a local mirror of the data and asset origins
        #[arg(long, value_name = "DIR")]
        offline: Option<PathBuf>,

        #[command(flatten)]
        overrides: GeneratorOverrides,
    },

    /// Download the image assets referenced by the published primary database
    #[command(visible_alias = "a")]
    Assets {
        /// Read assets from a local mirror of the asset origin
        #[arg(long, value_name = "DIR")]
        offline: Option<PathBuf>,

        #[command(flatten)]
        overrides: GeneratorOverrides,
    },

    /// Write the BuildData and Database JSON Schema documents
    Schema {
        /// Output directory
        #[arg(short, long, default_value = "static/schemas")]
        out: PathBuf,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        #[command(flatten)]
        overrides: GeneratorOverrides,
    },
}
