//! Minimize command - replace geometry with one quad per material

use anyhow::{Context, Result};
use clap::Args;
use glbmin_core::minimize_glb;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Arguments for the minimize command
#[derive(Args)]
pub struct MinimizeArgs {
    /// Input GLB file
    pub input: PathBuf,

    /// Output path (default: <input stem>.min.glb next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (default: ./glbmin.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// `scene.glb` becomes `scene.min.glb` in the same directory
pub fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}.min.glb"))
}

pub fn execute(args: MinimizeArgs) -> Result<()> {
    let registry = Config::discover(args.config.as_deref())?.registry()?;

    let input = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let output = minimize_glb(&input, &registry)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    let path = args.output.unwrap_or_else(|| default_output(&args.input));
    fs::write(&path, &output).with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(
        input = %args.input.display(),
        output = %path.display(),
        before = input.len(),
        after = output.len(),
        "minimized"
    );
    Ok(())
}
