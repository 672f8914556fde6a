//! Text histograms with explicit bin edges
//!
//! Bins are half-open `[edge_i, edge_i+1)` except the last, which also
//! includes its upper edge. Values outside the edges are counted as
//! underflow or overflow instead of being dropped silently.
//!
//! Every bin keeps both its entry count and its summed weight. Once any
//! value is added with [`Histogram::add_weighted`] the histogram is shown by
//! weight instead of by count.

use crate::{Result, VizError};
use std::fmt::Write;

/// Scale type for histogram bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    Linear,
    /// Logarithmic scale (base 10)
    Log10,
}

/// Configuration for histogram display
#[derive(Debug, Clone)]
pub struct HistogramConfig {
    /// Title for the histogram
    pub title: Option<String>,
    /// Character to use for bars
    pub bar_char: char,
    /// Whether to show percentage
    pub show_percentage: bool,
    /// Whether to show counts
    pub show_counts: bool,
    pub scale: Scale,
    /// Whether to show empty bins
    pub show_empty_bins: bool,
    /// Maximum bar width in characters
    pub max_bar_width: usize,
    /// Decimal places used for bin edges
    pub edge_precision: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            title: None,
            bar_char: '#',
            show_percentage: true,
            show_counts: true,
            scale: Scale::Linear,
            show_empty_bins: true,
            max_bar_width: 40,
            edge_precision: 2,
        }
    }
}

/// Histogram of `f64` values
#[derive(Debug, Clone)]
pub struct Histogram {
    bin_edges: Vec<f64>,
    counts: Vec<u64>,
    weights: Vec<f64>,
    underflow: u64,
    overflow: u64,
    weighted: bool,
    config: HistogramConfig,
}

impl Histogram {
    /// Create a histogram with the given bin edges.
    ///
    /// Edges must be finite and strictly increasing, at least two of them.
    pub fn new(bin_edges: Vec<f64>) -> Result<Self> {
        if bin_edges.len() < 2 {
            return Err(VizError::HistogramError(
                "Histogram must have at least 2 bin edges".to_string(),
            ));
        }
        if bin_edges.iter().any(|e| !e.is_finite()) {
            return Err(VizError::HistogramError(
                "Histogram bin edges must be finite".to_string(),
            ));
        }
        if bin_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VizError::HistogramError(
                "Histogram bin edges must be in ascending order".to_string(),
            ));
        }

        let num_bins = bin_edges.len() - 1;
        Ok(Self {
            bin_edges,
            counts: vec![0; num_bins],
            weights: vec![0.0; num_bins],
            underflow: 0,
            overflow: 0,
            weighted: false,
            config: HistogramConfig::default(),
        })
    }

    /// Create a histogram with `num_bins` equal bins spanning `[min, max]`.
    pub fn new_equal_bins(min: f64, max: f64, num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(VizError::HistogramError(
                "Histogram must have at least 1 bin".to_string(),
            ));
        }
        let step = (max - min) / num_bins as f64;
        // the last edge is `max` exactly so the maximum lands in the last bin
        let edges = (0..=num_bins)
            .map(|i| if i == num_bins { max } else { min + step * i as f64 })
            .collect();
        Self::new(edges)
    }

    /// Create a histogram with edges `start, start + step, ...` up to and
    /// including `stop` (within half a step).
    pub fn new_stepped(start: f64, stop: f64, step: f64) -> Result<Self> {
        if step.is_nan() || step <= 0.0 {
            return Err(VizError::HistogramError(
                "Histogram step must be positive".to_string(),
            ));
        }
        let n = ((stop - start) / step + 0.5).floor();
        if n < 1.0 {
            return Err(VizError::HistogramError(
                "Histogram range must span at least one step".to_string(),
            ));
        }
        let edges = (0..=n as usize).map(|i| start + step * i as f64).collect();
        Self::new(edges)
    }

    /// Set the configuration for the histogram
    pub fn with_config(mut self, config: HistogramConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Bin index of `value`, or `None` outside the edges. NaN has no bin.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        let first = self.bin_edges[0];
        let last = self.bin_edges[self.bin_edges.len() - 1];
        if value.is_nan() || value < first || value > last {
            return None;
        }
        let upper = self.bin_edges.partition_point(|&e| e <= value);
        Some(upper.saturating_sub(1).min(self.counts.len() - 1))
    }

    fn fill(&mut self, value: f64, weight: f64) {
        match self.find_bin(value) {
            Some(idx) => {
                self.counts[idx] += 1;
                self.weights[idx] += weight;
            }
            None if value < self.bin_edges[0] => self.underflow += 1,
            None => self.overflow += 1,
        }
    }

    /// Add a value to the histogram
    pub fn add(&mut self, value: f64) {
        self.fill(value, 1.0);
    }

    /// Add a value carrying `weight`. Non-finite weights count as zero.
    pub fn add_weighted(&mut self, value: f64, weight: f64) {
        self.weighted = true;
        self.fill(value, if weight.is_finite() { weight } else { 0.0 });
    }

    /// Add `(value, weight)` pairs.
    pub fn add_all_weighted<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        for (value, weight) in entries {
            self.add_weighted(value, weight);
        }
    }

    /// Add multiple values to the histogram
    pub fn add_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.add(value);
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Summed weight per bin; equal to the counts for unweighted filling.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Summed weight inside the edges.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    /// Values below the first edge.
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    /// Values above the last edge, plus NaN.
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Entries inside the edges.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn bar_length(&self, value: f64, max_value: f64) -> usize {
        if value <= 0.0 || max_value <= 0.0 {
            return 0;
        }
        let width = self.config.max_bar_width as f64;
        let fraction = match self.config.scale {
            Scale::Linear => value / max_value,
            Scale::Log10 => (1.0 + value).log10() / (1.0 + max_value).log10(),
        };
        ((fraction * width).round() as usize).max(1)
    }

    /// Format the histogram as a string
    pub fn format(&self) -> Result<String> {
        let mut output = String::new();

        if let Some(title) = &self.config.title {
            writeln!(output, "{title}")?;
            writeln!(output, "{}", "=".repeat(title.len()))?;
        }

        let p = self.config.edge_precision;
        let labels: Vec<String> = self
            .bin_edges
            .windows(2)
            .map(|w| format!("{:.p$} - {:.p$}", w[0], w[1]))
            .collect();
        let label_width = labels.iter().map(String::len).max().unwrap_or(0).max(5);

        // weighted histograms show summed weights, others plain counts
        let (heading, values, cells): (&str, Vec<f64>, Vec<String>) = if self.weighted {
            (
                "Weight",
                self.weights.clone(),
                self.weights.iter().map(|w| format!("{w:.4}")).collect(),
            )
        } else {
            (
                "Count",
                self.counts.iter().map(|&c| c as f64).collect(),
                self.counts.iter().map(u64::to_string).collect(),
            )
        };
        let value_width = cells.iter().map(String::len).max().unwrap_or(1).max(6);

        let mut header = format!("{:<label_width$} ", "Range");
        if self.config.show_counts {
            write!(header, "| {heading:>value_width$} ")?;
        }
        if self.config.show_percentage {
            write!(header, "| {:>7} ", "Percent")?;
        }
        header.push_str("| Bar");
        writeln!(output, "{header}")?;
        writeln!(output, "{}", "-".repeat(header.len()))?;

        let total = self.total_count();
        let sum: f64 = values.iter().sum();
        let max_value = values.iter().copied().fold(0.0, f64::max);
        for ((label, &value), cell) in labels.iter().zip(&values).zip(&cells) {
            if value == 0.0 && !self.config.show_empty_bins {
                continue;
            }
            write!(output, "{label:<label_width$} ")?;
            if self.config.show_counts {
                write!(output, "| {cell:>value_width$} ")?;
            }
            if self.config.show_percentage {
                let pct = if sum > 0.0 { 100.0 * value / sum } else { 0.0 };
                write!(output, "| {pct:>6.2}% ")?;
            }
            let bar = self
                .config
                .bar_char
                .to_string()
                .repeat(self.bar_length(value, max_value));
            writeln!(output, "| {bar}")?;
        }

        writeln!(
            output,
            "Entries: {total}  Underflow: {}  Overflow: {}",
            self.underflow, self.overflow
        )?;
        if self.weighted {
            writeln!(output, "Total weight: {:.4}", self.total_weight())?;
        }
        if self.config.scale == Scale::Log10 {
            writeln!(output, "Note: bar lengths use a log10 scale")?;
        }

        Ok(output)
    }

    /// Print the histogram to stdout
    pub fn print(&self) -> Result<()> {
        println!("{}", self.format()?);
        Ok(())
    }
}

/// Histogram `values` into the given edges and format it.
pub fn histogram(values: &[f64], bin_edges: Vec<f64>, title: Option<String>) -> Result<String> {
    let mut hist = Histogram::new(bin_edges)?;
    if let Some(title) = title {
        hist = hist.with_title(title);
    }
    hist.add_all(values.iter().copied());
    hist.format()
}
