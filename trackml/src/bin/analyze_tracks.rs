//! Track quality analysis over a TrackML dataset
//!
//! Walks the events of a dataset directory, assembles one track per truth
//! particle, rejects sparse and backtracking tracks and extracts features of
//! the rest. Prints the run summary, writes the feature table as CSV and
//! shows text histograms and profiles of the features, followed by the pt
//! flow of the first event's particles.
//!
//! When `--detectors` is given, every accepted track is also checked for
//! containment in a single phi sector for each configured bin count.
//!
//! Usage:
//! ```
//! cargo run --release --bin analyze_tracks -- --dataset train_100_events [OPTIONS]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use trackml::args::AnalysisArgs;
use trackml::event::Particle;
use trackml::geometry::load_detectors;
use trackml::pipeline::Analysis;
use trackml::report::{render_feature_report, render_pt_flow};

#[derive(Parser, Debug)]
#[command(
    name = "analyze_tracks",
    about = "Classify truth tracks of TrackML events and extract their features",
    long_about = None
)]
struct Args {
    /// Directory holding <event>-{hits,cells,particles,truth}.csv[.gz]
    #[arg(long)]
    dataset: PathBuf,

    /// detectors.csv, enables the single phi sector check
    #[arg(long)]
    detectors: Option<PathBuf>,

    /// Output CSV file for accepted track features
    #[arg(long, default_value = "track_features.csv")]
    output: PathBuf,

    /// Write the effective configuration as JSON
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Skip the text histograms and profiles
    #[arg(long, default_value_t = false)]
    no_plots: bool,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.analysis.resolve().context("invalid analysis settings")?;
    info!(
        "Barrel volumes {:?}, min layers {}, radial step {} mm, ordering {}",
        config.barrel_volumes, config.min_layers, config.radial_step_threshold, config.hit_ordering
    );

    if let Some(path) = &args.save_config {
        config
            .save_to_file(path)
            .with_context(|| format!("failed to save config to {}", path.display()))?;
        info!("Saved configuration to {}", path.display());
    }

    let mut analysis = Analysis::new(config)?;
    if let Some(path) = &args.detectors {
        let detectors = load_detectors(path)
            .with_context(|| format!("failed to load detectors from {}", path.display()))?;
        info!("Loaded {} detector modules", detectors.len());
        analysis = analysis.with_geometry(&detectors)?;
    }

    let events = analysis
        .event_ids(&args.dataset)
        .with_context(|| format!("failed to list events in {}", args.dataset.display()))?;

    let pb = ProgressBar::new(events.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ETA: {eta}")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Analyzing events");

    let mut first_event: Option<(String, Vec<Particle>)> = None;
    analysis
        .process_events(&args.dataset, &events, |event| {
            if first_event.is_none() {
                first_event = Some((event.id.clone(), event.particles.clone()));
            }
            pb.inc(1);
        })
        .with_context(|| format!("failed to analyze {}", args.dataset.display()))?;
    pb.finish_with_message("Analyzed events");

    let result = analysis.finish();
    println!("{}", result.summary);
    for count in &result.single_bin {
        println!(
            " --> {:>2} phi bins: {} / {} good tracks in a single bin ({:.1}%)",
            count.n_bins,
            count.contained,
            count.checked,
            100.0 * count.fraction()
        );
    }

    result
        .features
        .save_csv(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        "Wrote {} feature rows to {}",
        result.features.len(),
        args.output.display()
    );

    if !args.no_plots {
        print!("{}", render_feature_report(&result.features)?);
        if let Some((event_id, particles)) = &first_event {
            println!("Event {event_id}");
            print!("{}", render_pt_flow(particles)?);
        }
    }

    Ok(())
}
