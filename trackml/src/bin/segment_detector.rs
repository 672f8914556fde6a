//! Phi segmentation of the pixel barrel
//!
//! Reads `detectors.csv`, keeps the modules of the barrel volumes and splits
//! them into equal azimuthal sectors for each requested bin count. For every
//! bin count the sector edges, the layers found in each volume and the number
//! of modules per sector and layer are printed.
//!
//! Usage:
//! ```
//! cargo run --bin segment_detector -- --detectors detectors.csv --bins 2:16:2
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::f64::consts::PI;
use std::path::PathBuf;
use trackml::args::BinCounts;
use trackml::config::DEFAULT_BARREL_VOLUMES;
use trackml::geometry::{load_detectors, PhiSegmentation};

#[derive(Parser, Debug)]
#[command(
    name = "segment_detector",
    about = "Split barrel detector modules into phi sectors",
    long_about = None
)]
struct Args {
    /// Detector geometry CSV
    #[arg(long, default_value = "detectors.csv")]
    detectors: PathBuf,

    /// Phi bin counts, "start:stop:step" or a comma list
    #[arg(long, default_value = "2:16:2")]
    bins: BinCounts,

    /// Volume ids to segment (comma separated)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_BARREL_VOLUMES)]
    volumes: Vec<u32>,

    /// Also print module counts per sector for every layer
    #[arg(long, default_value_t = false)]
    per_layer: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let detectors = load_detectors(&args.detectors)
        .with_context(|| format!("failed to load {}", args.detectors.display()))?;
    info!(
        "Loaded {} modules from {}, segmenting volumes {:?} into {} phi bins",
        detectors.len(),
        args.detectors.display(),
        args.volumes,
        args.bins
    );

    for &n_bins in &args.bins.0 {
        let segmentation = PhiSegmentation::new(&detectors, n_bins, &args.volumes)?;

        println!("==> {n_bins} phi bins");
        let edges: Vec<String> = segmentation
            .edges()
            .iter()
            .map(|e| format!("{:.3}", e / PI))
            .collect();
        println!("    edges / pi: [{}]", edges.join(", "));

        for (volume, layers) in segmentation.layers_by_volume() {
            let layers: Vec<String> = layers.iter().map(u32::to_string).collect();
            println!("    volume {volume}: layers {}", layers.join(", "));
        }

        let per_bin = segmentation.modules_per_bin();
        println!(
            "    modules per bin: {:?} ({} total)",
            per_bin,
            segmentation.modules().len()
        );

        if args.per_layer {
            for ((volume, layer), counts) in segmentation.modules_per_bin_by_layer() {
                println!("    volume {volume} layer {layer:>2}: {counts:?}");
            }
        }
    }

    Ok(())
}
