//! Reduce a TrackML dataset to the inner detector volumes
//!
//! Every event of `--input` is rewritten into `--output` keeping only hits
//! in volumes below `--max-volume`, together with their truth rows and cells.
//! Truth and particle tables gain derived columns (tR, p, pt, eta, phi).
//!
//! Usage:
//! ```
//! cargo run --release --bin skim_events -- --input train_100_events --output skims
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use trackml::skim::{skim_dataset, DEFAULT_MAX_VOLUME};

#[derive(Parser, Debug)]
#[command(
    name = "skim_events",
    about = "Keep only inner-volume hits of TrackML events",
    long_about = None
)]
struct Args {
    /// Input dataset directory
    #[arg(long)]
    input: PathBuf,

    /// Output directory, created if missing
    #[arg(long)]
    output: PathBuf,

    /// Hits in volumes at or above this id are dropped
    #[arg(long, default_value_t = DEFAULT_MAX_VOLUME)]
    max_volume: u32,

    /// Stop after this many events
    #[arg(long)]
    max_events: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let reports = skim_dataset(&args.input, &args.output, args.max_volume, args.max_events)
        .with_context(|| {
            format!(
                "failed to skim {} into {}",
                args.input.display(),
                args.output.display()
            )
        })?;

    let hits_in: usize = reports.iter().map(|r| r.hits_in).sum();
    let hits_kept: usize = reports.iter().map(|r| r.hits_kept).sum();
    info!(
        "Skimmed {} events, kept {hits_kept} / {hits_in} hits",
        reports.len()
    );
    Ok(())
}
