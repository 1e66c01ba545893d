//! Inspect command - decode a GLB file and report what it contains

use anyhow::{Context, Result};
use clap::Args;
use glbmin_core::{Document, GlbCodec};
use std::path::PathBuf;

use crate::config::Config;

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// GLB file to decode
    pub input: PathBuf,

    /// Configuration file (default: ./glbmin.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// One line per material: index, name and attached extensions
fn material_lines(doc: &Document) -> Vec<String> {
    doc.list_materials()
        .iter()
        .enumerate()
        .filter_map(|(i, &key)| {
            let material = doc.material(key)?;
            let name = material.name.as_deref().unwrap_or("<unnamed>");
            let extensions: Vec<&str> = material.extensions.keys().map(String::as_str).collect();
            Some(if extensions.is_empty() {
                format!("  [{i}] {name}")
            } else {
                format!("  [{i}] {name} ({})", extensions.join(", "))
            })
        })
        .collect()
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let registry = Config::discover(args.config.as_deref())?.registry()?;

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let doc = GlbCodec::new(&registry)
        .decode(&bytes)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    let counts = doc.counts();
    tracing::info!(path = %args.input.display(), bytes = bytes.len(), %counts, "decoded");

    println!("{}", args.input.display());
    println!("  {counts}");
    for line in material_lines(&doc) {
        println!("{line}");
    }
    Ok(())
}
