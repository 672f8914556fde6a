//! Segment and truth efficiency of prepared hit graphs.
//!
//! Graphs are `.npz` archives holding a node feature matrix `X` (one row per
//! node) and edge labels `y` (one entry per candidate segment, non-zero when
//! the segment joins two hits of the same particle). Graph directories are
//! grouped by the pt cut used to build them, `<prefix><label>/`, and a text
//! truth file gives the true segment count of every event under each cut.

use crate::error::{Result, TrackmlError};
use crate::stats::{median, MeanStd};
use log::{debug, info, warn};
use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Directory suffixes of the pt cuts, in GeV with `p` for the decimal point.
pub const PT_CUT_LABELS: [&str; 10] = [
    "0p5", "0p6", "0p75", "1", "1p5", "2", "2p5", "3", "4", "5",
];

/// Numeric value of a pt cut label, `"0p75"` → 0.75.
pub fn pt_cut_value(label: &str) -> Option<f64> {
    label.replace('p', ".").parse().ok()
}

/// Event id of a graph file: the file name up to the first `_`.
pub fn graph_event_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('_').next().unwrap_or_default().to_string()
}

/// Shape and labels of one graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub event: String,
    pub n_nodes: usize,
    pub n_edges: usize,
    /// Sum of the edge labels.
    pub n_true_edges: f64,
    /// File size in MB (10^6 bytes).
    pub size_mb: f64,
}

impl GraphSummary {
    /// Fraction of the graph's segments that are true. Zero for a graph
    /// without edges.
    pub fn segment_efficiency(&self) -> f64 {
        if self.n_edges == 0 {
            0.0
        } else {
            self.n_true_edges / self.n_edges as f64
        }
    }

    /// Fraction of the event's true segments that made it into the graph.
    pub fn truth_efficiency(&self, true_segments: u64) -> f64 {
        if true_segments == 0 {
            0.0
        } else {
            self.n_true_edges / true_segments as f64
        }
    }
}

fn graph_error(path: &Path, reason: impl Into<String>) -> TrackmlError {
    TrackmlError::Graph {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn npz_error(path: &Path, e: ReadNpzError) -> TrackmlError {
    graph_error(path, e.to_string())
}

// numpy writes `name.npy` inside the archive; depending on the reader the
// suffix may or may not be reported.
fn entry_name(npz: &mut NpzReader<File>, path: &Path, array: &str) -> Result<String> {
    let with_suffix = format!("{array}.npy");
    npz.names()
        .map_err(|e| npz_error(path, e))?
        .into_iter()
        .find(|n| n == array || *n == with_suffix)
        .ok_or_else(|| graph_error(path, format!("no array named '{array}'")))
}

fn row_count(npz: &mut NpzReader<File>, name: &str) -> std::result::Result<usize, ReadNpzError> {
    let shape = match npz.by_name::<OwnedRepr<f32>, IxDyn>(name) {
        Ok(x) => x.shape().to_vec(),
        Err(_) => npz.by_name::<OwnedRepr<f64>, IxDyn>(name)?.shape().to_vec(),
    };
    Ok(shape.first().copied().unwrap_or(0))
}

/// Number of labels and their sum, for float, integer or boolean labels.
fn label_sum(
    npz: &mut NpzReader<File>,
    name: &str,
) -> std::result::Result<(usize, f64), ReadNpzError> {
    if let Ok(y) = npz.by_name::<OwnedRepr<f32>, IxDyn>(name) {
        return Ok((y.len(), y.iter().map(|&v| f64::from(v)).sum()));
    }
    if let Ok(y) = npz.by_name::<OwnedRepr<f64>, IxDyn>(name) {
        return Ok((y.len(), y.sum()));
    }
    if let Ok(y) = npz.by_name::<OwnedRepr<i64>, IxDyn>(name) {
        return Ok((y.len(), y.iter().map(|&v| v as f64).sum()));
    }
    if let Ok(y) = npz.by_name::<OwnedRepr<u8>, IxDyn>(name) {
        return Ok((y.len(), y.iter().map(|&v| f64::from(v)).sum()));
    }
    let y: ArrayD<bool> = npz.by_name(name)?;
    Ok((y.len(), y.iter().filter(|&&v| v).count() as f64))
}

/// Read the node count and edge labels of one graph file.
pub fn load_graph(path: &Path) -> Result<GraphSummary> {
    let file = File::open(path).map_err(|e| TrackmlError::io(path, e))?;
    let size_bytes = file
        .metadata()
        .map_err(|e| TrackmlError::io(path, e))?
        .len();
    let mut npz = NpzReader::new(file).map_err(|e| npz_error(path, e))?;

    let x_name = entry_name(&mut npz, path, "X")?;
    let y_name = entry_name(&mut npz, path, "y")?;
    let n_nodes = row_count(&mut npz, &x_name).map_err(|e| npz_error(path, e))?;
    let (n_edges, n_true_edges) = label_sum(&mut npz, &y_name).map_err(|e| npz_error(path, e))?;

    Ok(GraphSummary {
        event: graph_event_id(path),
        n_nodes,
        n_edges,
        n_true_edges,
        size_mb: size_bytes as f64 / 1e6,
    })
}

/// Load every `.npz` graph in `dir`, in file name order.
pub fn load_graph_dir(dir: &Path, max_graphs: Option<usize>) -> Result<Vec<GraphSummary>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TrackmlError::io(dir, e))?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TrackmlError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "npz") {
            paths.push(path);
        }
    }
    paths.sort();
    if let Some(max) = max_graphs {
        paths.truncate(max);
    }
    if paths.is_empty() {
        warn!("No graphs found in {}", dir.display());
    }
    debug!("Loading {} graphs from {}", paths.len(), dir.display());
    paths.iter().map(|p| load_graph(p)).collect()
}

/// True segment counts per event and pt cut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TruthTable {
    counts: HashMap<String, [u64; PT_CUT_LABELS.len()]>,
}

impl TruthTable {
    /// Parse lines of `evt_id n0 n1 ... n9`, one count per [`PT_CUT_LABELS`]
    /// entry. Blank lines are skipped; a repeated event id replaces the
    /// earlier line.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut counts = HashMap::new();
        for (i, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(event) = fields.next() else {
                continue;
            };
            let err = |reason: String| TrackmlError::TruthTable {
                path: path.to_path_buf(),
                line: i + 1,
                reason,
            };

            let mut row = [0u64; PT_CUT_LABELS.len()];
            for (slot, label) in row.iter_mut().zip(PT_CUT_LABELS) {
                let field = fields
                    .next()
                    .ok_or_else(|| err(format!("missing count for pt cut {label}")))?;
                *slot = field
                    .parse()
                    .map_err(|_| err(format!("'{field}' is not a segment count")))?;
            }
            if let Some(extra) = fields.next() {
                return Err(err(format!("unexpected trailing field '{extra}'")));
            }
            counts.insert(event.to_string(), row);
        }
        Ok(Self { counts })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TrackmlError::io(path, e))?;
        let table = Self::parse(&text, path)?;
        info!("Loaded truth counts for {} events from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// True segment count of `event` under the pt cut at `cut_index`.
    pub fn true_segments(&self, event: &str, cut_index: usize) -> Result<u64> {
        let row = self
            .counts
            .get(event)
            .ok_or_else(|| TrackmlError::MissingTruthEntry {
                event: event.to_string(),
            })?;
        row.get(cut_index).copied().ok_or_else(|| {
            TrackmlError::InvalidConfig(format!("pt cut index {cut_index} out of range"))
        })
    }
}

/// Efficiency and size statistics over the graphs of one pt cut.
#[derive(Debug, Clone, PartialEq)]
pub struct CutEfficiency {
    pub label: String,
    pub pt_cut: f64,
    pub n_graphs: usize,
    pub segment_efficiency: MeanStd,
    /// NaN when there are no graphs.
    pub segment_efficiency_median: f64,
    pub truth_efficiency: MeanStd,
    pub n_nodes: MeanStd,
    pub n_edges: MeanStd,
    pub size_mb: MeanStd,
}

/// Summarise the graphs built with the pt cut at `cut_index`.
pub fn summarize_cut(
    cut_index: usize,
    graphs: &[GraphSummary],
    truth: &TruthTable,
) -> Result<CutEfficiency> {
    let label = PT_CUT_LABELS.get(cut_index).ok_or_else(|| {
        TrackmlError::InvalidConfig(format!("pt cut index {cut_index} out of range"))
    })?;

    let truth_effs = graphs
        .iter()
        .map(|g| Ok(g.truth_efficiency(truth.true_segments(&g.event, cut_index)?)))
        .collect::<Result<Vec<f64>>>()?;
    let collect = |f: fn(&GraphSummary) -> f64| graphs.iter().map(f).collect::<Vec<f64>>();
    let segment_effs = collect(GraphSummary::segment_efficiency);

    Ok(CutEfficiency {
        label: label.to_string(),
        pt_cut: pt_cut_value(label).unwrap_or(f64::NAN),
        n_graphs: graphs.len(),
        segment_efficiency: MeanStd::from_samples(&segment_effs),
        segment_efficiency_median: median(&segment_effs).unwrap_or(f64::NAN),
        truth_efficiency: MeanStd::from_samples(&truth_effs),
        n_nodes: MeanStd::from_samples(&collect(|g| g.n_nodes as f64)),
        n_edges: MeanStd::from_samples(&collect(|g| g.n_edges as f64)),
        size_mb: MeanStd::from_samples(&collect(|g| g.size_mb)),
    })
}

/// Evaluate every pt cut whose directory `<prefix><label>` exists.
pub fn evaluate(
    prefix: &str,
    truth: &TruthTable,
    max_graphs: Option<usize>,
) -> Result<Vec<CutEfficiency>> {
    let mut results = Vec::new();
    for (i, label) in PT_CUT_LABELS.iter().enumerate() {
        let dir = PathBuf::from(format!("{prefix}{label}"));
        if !dir.is_dir() {
            warn!("Skipping pt cut {label}: {} is not a directory", dir.display());
            continue;
        }
        let graphs = load_graph_dir(&dir, max_graphs)?;
        let summary = summarize_cut(i, &graphs, truth)?;
        info!(
            "pt={label}: {} graphs, segment efficiency {:.3}",
            summary.n_graphs, summary.segment_efficiency
        );
        results.push(summary);
    }
    Ok(results)
}

/// The pt cut scan of one graph construction, such as `LP` or `LP+`.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyRun {
    pub label: String,
    pub cuts: Vec<CutEfficiency>,
}

/// Which efficiency of a [`CutEfficiency`] to plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfficiencyMetric {
    Segment,
    Truth,
}

impl EfficiencyMetric {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Segment => "Segment efficiency",
            Self::Truth => "Truth efficiency",
        }
    }

    pub fn of(&self, cut: &CutEfficiency) -> MeanStd {
        match self {
            Self::Segment => cut.segment_efficiency,
            Self::Truth => cut.truth_efficiency,
        }
    }
}

#[derive(Serialize)]
struct EfficiencyRecord<'a> {
    graphs: &'a str,
    pt_cut: &'a str,
    n_graphs: usize,
    seg_eff: f64,
    seg_eff_er: f64,
    seg_eff_median: f64,
    truth_eff: f64,
    truth_eff_er: f64,
    n_segs: f64,
    n_segs_er: f64,
    n_nodes: f64,
    n_nodes_er: f64,
    size: f64,
    size_er: f64,
}

impl<'a> EfficiencyRecord<'a> {
    fn new(graphs: &'a str, c: &'a CutEfficiency) -> Self {
        Self {
            graphs,
            pt_cut: &c.label,
            n_graphs: c.n_graphs,
            seg_eff: c.segment_efficiency.mean,
            seg_eff_er: c.segment_efficiency.std,
            seg_eff_median: c.segment_efficiency_median,
            truth_eff: c.truth_efficiency.mean,
            truth_eff_er: c.truth_efficiency.std,
            n_segs: c.n_edges.mean,
            n_segs_er: c.n_edges.std,
            n_nodes: c.n_nodes.mean,
            n_nodes_er: c.n_nodes.std,
            size: c.size_mb.mean,
            size_er: c.size_mb.std,
        }
    }
}

/// Write one CSV row per run and pt cut.
pub fn save_summary_csv(runs: &[EfficiencyRun], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| TrackmlError::csv(path, e))?;
    for run in runs {
        for cut in &run.cuts {
            wtr.serialize(EfficiencyRecord::new(&run.label, cut))
                .map_err(|e| TrackmlError::csv(path, e))?;
        }
    }
    wtr.flush().map_err(|e| TrackmlError::io(path, e))
}
