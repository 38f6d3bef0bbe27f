//! Build token command handlers

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

use stella::{codec, BuildData, Database, DatabaseLoader, Language};

/// Read a file, or stdin when the path is `-`
fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// A file holds either one build or an array of builds
fn builds_in(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        single => vec![single],
    }
}

/// Decode a token, reporting only the opaque failure to the user
fn decode_token(token: &str) -> Result<BuildData> {
    codec::decode(token.trim()).map_err(|e| {
        tracing::debug!(cause = %e.cause(), "token rejected");
        anyhow!("{}", e)
    })
}

pub fn encode(input: &Path) -> Result<()> {
    let text = read_input(input)?;
    let value: Value = serde_json::from_str(&text).context("Input is not valid JSON")?;
    let build = codec::validate_json(&value)?;
    println!("{}", codec::encode(&build)?);
    Ok(())
}

pub fn decode(token: &str, compact: bool) -> Result<()> {
    let build = decode_token(token)?;
    let json = if compact {
        serde_json::to_string(&build)?
    } else {
        serde_json::to_string_pretty(&build)?
    };
    println!("{}", json);
    Ok(())
}

/// Check every build in `files`; fails if any build is invalid
pub fn validate(files: &[impl AsRef<Path>]) -> Result<()> {
    let mut failures = 0;
    let mut total = 0;

    for file in files {
        let file = file.as_ref();
        let text = read_input(file)?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", file.display()))?;

        for (index, build) in builds_in(value).iter().enumerate() {
            total += 1;
            match codec::validate_json(build) {
                Ok(_) => println!("{}[{}]: ok", file.display(), index),
                Err(e) => {
                    failures += 1;
                    println!("{}[{}]: {}", file.display(), index, e);
                }
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} builds failed validation", failures, total);
    }
    println!("{} builds valid", total);
    Ok(())
}

pub fn show(token: &str, lang: Language, database_dir: &Path) -> Result<()> {
    let build = decode_token(token)?;
    let loader = DatabaseLoader::from_dir(database_dir);
    let database = loader.get(lang)?;
    print!("{}", describe(&build, &database));
    Ok(())
}

/// Human-readable summary of a build against a snapshot
fn describe(build: &BuildData, db: &Database) -> String {
    let mut out = String::new();
    out.push_str(&format!("Build: {}\n", build.name));
    if !build.description.is_empty() {
        out.push_str(&format!("  {}\n", build.description));
    }

    let character = |id: Option<u32>| match id {
        Some(id) => db
            .character(id)
            .map(|c| format!("{} ({})", c.name, id))
            .unwrap_or_else(|| format!("unknown character {}", id)),
        None => "-".to_string(),
    };
    out.push_str(&format!("Main:      {}\n", character(build.main_id)));
    out.push_str(&format!("Support 1: {}\n", character(build.support1_id)));
    out.push_str(&format!("Support 2: {}\n", character(build.support2_id)));

    let discs: Vec<String> = build
        .disc_ids()
        .into_iter()
        .map(|id| {
            db.disc(id)
                .map(|d| format!("{} ({})", d.name, id))
                .unwrap_or_else(|| format!("unknown disc {}", id))
        })
        .collect();
    if !discs.is_empty() {
        out.push_str(&format!("Discs:     {}\n", discs.join(", ")));
    }

    out.push_str("Potentials:\n");
    for &id in &build.potential_ids {
        let level = build
            .potential_level(id)
            .map(|l| format!(" Lv.{}", l))
            .unwrap_or_default();
        match db.potential(id) {
            Some((owner, potential)) => out.push_str(&format!(
                "  {} [{}]{}\n",
                potential.name, owner.name, level
            )),
            None => out.push_str(&format!("  unknown potential {}{}\n", id, level)),
        }
    }
    out
}
