//! Segment and truth efficiency of prepared hit graphs
//!
//! For each pt cut label the graphs in `<prefix><label>/` are loaded and
//! compared with the true segment counts of the truth file. Reports the mean
//! and spread of segment efficiency, truth efficiency, node and edge counts
//! and file size per cut, and writes them as one CSV row per cut.
//!
//! Several graph constructions can be compared by repeating `--prefix` and
//! `--truth` (paired in order). Segment and truth efficiency against the pt
//! cut are then plotted with one column per construction.
//!
//! Usage:
//! ```
//! cargo run --release --bin graph_efficiency -- \
//!     --prefix graphs_LP/pt_ --truth truth_LP.txt --label LP \
//!     --prefix graphs_LPP/pt_ --truth truth_LPP.txt --label LP+
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;
use trackml::efficiency::{
    evaluate, save_summary_csv, EfficiencyMetric, EfficiencyRun, TruthTable,
};
use trackml::report::efficiency_vs_pt;

#[derive(Parser, Debug)]
#[command(
    name = "graph_efficiency",
    about = "Measure segment and truth efficiency of hit graphs per pt cut",
    long_about = None
)]
struct Args {
    /// Graph directory prefix, the pt cut label is appended. Repeat to
    /// compare constructions
    #[arg(long, required = true)]
    prefix: Vec<String>,

    /// Text file of `evt_id n0 ... n9` true segment counts, one per --prefix
    #[arg(long, required = true)]
    truth: Vec<PathBuf>,

    /// Name of each construction in plots and CSV; defaults to the prefix
    #[arg(long)]
    label: Vec<String>,

    /// Only read the first N graphs of each directory
    #[arg(long)]
    max_graphs: Option<usize>,

    /// Output CSV file, one row per construction and pt cut
    #[arg(long, default_value = "graph_efficiency.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.truth.len() != args.prefix.len() {
        bail!(
            "got {} --truth files for {} --prefix values",
            args.truth.len(),
            args.prefix.len()
        );
    }
    if !args.label.is_empty() && args.label.len() != args.prefix.len() {
        bail!(
            "got {} --label values for {} --prefix values",
            args.label.len(),
            args.prefix.len()
        );
    }

    let mut runs = Vec::new();
    for (i, (prefix, truth_path)) in args.prefix.iter().zip(&args.truth).enumerate() {
        let label = args.label.get(i).unwrap_or(prefix).clone();
        let truth = TruthTable::load(truth_path).with_context(|| {
            format!("failed to read truth counts from {}", truth_path.display())
        })?;
        if truth.is_empty() {
            warn!("Truth file {} has no events", truth_path.display());
        }

        let cuts = evaluate(prefix, &truth, args.max_graphs)
            .with_context(|| format!("failed to evaluate graphs under {prefix}"))?;
        if cuts.is_empty() {
            warn!("No graph directories found for prefix {prefix}");
        }

        println!("{label}");
        for cut in &cuts {
            println!("pt cut {} GeV ({} graphs)", cut.pt_cut, cut.n_graphs);
            println!("==> Average segment efficiency = {:.4}", cut.segment_efficiency);
            println!("==> Median segment efficiency = {:.4}", cut.segment_efficiency_median);
            println!("==> Average truth efficiency = {:.4}", cut.truth_efficiency);
            println!("==> Average n_nodes = {:.1}", cut.n_nodes);
            println!("==> Average n_edges = {:.1}", cut.n_edges);
            println!("==> Average size = {:.3} MB", cut.size_mb);
        }
        println!();
        runs.push(EfficiencyRun { label, cuts });
    }

    if runs.iter().any(|run| !run.cuts.is_empty()) {
        for metric in [EfficiencyMetric::Segment, EfficiencyMetric::Truth] {
            println!("{}", efficiency_vs_pt(&runs, metric)?);
        }
    }

    save_summary_csv(&runs, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    let rows: usize = runs.iter().map(|run| run.cuts.len()).sum();
    info!("Wrote {rows} rows to {}", args.output.display());
    Ok(())
}
