//! Schema command handler

use anyhow::{Context, Result};
use std::path::Path;

/// Write both JSON Schema documents into `out`
pub fn handle(out: &Path) -> Result<()> {
    let written = stella::schema::write_schemas(out)
        .with_context(|| format!("Failed to write schemas to {}", out.display()))?;
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
