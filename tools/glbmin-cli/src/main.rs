//! glbmin - shrink GLB files down to their materials
//!
//! # Commands
//!
//! - `glbmin minimize <INPUT>` - Replace all geometry with one quad per material
//! - `glbmin inspect <INPUT>` - Decode a file and print entity counts
//! - `glbmin extensions` - List extensions with a typed decoding
//!
//! Logging follows `RUST_LOG` (default `info`); `--verbose` raises it to `debug`.

mod config;
mod inspect;
mod minimize;

use anyhow::Result;
use clap::{Parser, Subcommand};
use glbmin_core::ExtensionKind;
use tracing_subscriber::EnvFilter;

/// glbmin - material-preserving GLB minimizer
#[derive(Parser)]
#[command(name = "glbmin")]
#[command(about = "Replace GLB geometry with a placeholder quad per material")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace all geometry with one quad per material
    Minimize(minimize::MinimizeArgs),

    /// Decode a file and print entity counts
    Inspect(inspect::InspectArgs),

    /// List extensions with a typed decoding
    Extensions,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Minimize(args) => minimize::execute(args),
        Commands::Inspect(args) => inspect::execute(args),
        Commands::Extensions => {
            for kind in ExtensionKind::ALL {
                println!("{kind}");
            }
            Ok(())
        }
    }
}
