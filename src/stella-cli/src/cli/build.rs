//! Build command CLI definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum BuildCommand {
    /// Encode build JSON into a shareable token
    Encode {
        /// Build JSON file (- for stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Decode a token back into build JSON
    Decode {
        /// Build token (plain base64 tokens are accepted too)
        token: String,

        /// Print compact JSON on one line
        #[arg(short, long)]
        compact: bool,
    },

    /// Validate build JSON files (a single build or an array of builds each)
    Validate {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Describe a token's build using a generated database
    Show {
        /// Build token
        token: String,

        /// Database language
        #[arg(short, long, default_value = "en")]
        lang: stella::Language,

        /// Directory holding database_{lang}.json (defaults to the configured output directory)
        #[arg(long)]
        database_dir: Option<PathBuf>,
    },
}
