//! CLI argument definitions for stella
//!
//! This module contains all clap-derived structs and enums for CLI parsing.

mod build;
mod core;
mod generate;

pub use build::BuildCommand;
pub use core::{Cli, Commands};
pub use generate::GeneratorOverrides;
