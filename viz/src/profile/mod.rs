//! Binned profiles: mean of y in bins of x.
//!
//! The error on each bin mean is the standard error, the population spread
//! of the bin's y values divided by `sqrt(n)`. Empty bins have no mean.

use crate::{Result, VizError};
use std::fmt::Write;

/// Accumulated y statistics of one profile bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileBin {
    pub entries: u64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl ProfileBin {
    pub fn mean(&self) -> Option<f64> {
        (self.entries > 0).then(|| self.sum / self.entries as f64)
    }

    /// Standard error of the mean.
    pub fn error(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.entries as f64;
        // rounding can push the variance slightly negative for constant bins
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        Some(variance.sqrt() / n.sqrt())
    }
}

/// Profile of y against x over equal-width x bins.
#[derive(Debug, Clone)]
pub struct Profile {
    title: Option<String>,
    x_min: f64,
    x_max: f64,
    bins: Vec<ProfileBin>,
    skipped: u64,
}

impl Profile {
    /// `num_bins` equal bins over `[x_min, x_max]`; `x_max` falls in the last bin.
    pub fn new(x_min: f64, x_max: f64, num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(VizError::HistogramError(
                "Profile must have at least 1 bin".to_string(),
            ));
        }
        if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
            return Err(VizError::HistogramError(format!(
                "Invalid profile range {x_min}..{x_max}"
            )));
        }
        Ok(Self {
            title: None,
            x_min,
            x_max,
            bins: vec![ProfileBin::default(); num_bins],
            skipped: 0,
        })
    }

    /// Bins spanning the finite range of `xs`. A single distinct x value
    /// gets a unit-wide range around it.
    pub fn spanning(xs: &[f64], num_bins: usize) -> Result<Self> {
        let finite = xs.iter().copied().filter(|x| x.is_finite());
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
        if lo > hi {
            return Err(VizError::HistogramError(
                "Profile needs at least one finite x value".to_string(),
            ));
        }
        if lo == hi {
            Self::new(lo - 0.5, hi + 0.5, num_bins)
        } else {
            Self::new(lo, hi, num_bins)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn bin_width(&self) -> f64 {
        (self.x_max - self.x_min) / self.bins.len() as f64
    }

    fn find_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() || x < self.x_min || x > self.x_max {
            return None;
        }
        let idx = ((x - self.x_min) / self.bin_width()) as usize;
        Some(idx.min(self.bins.len() - 1))
    }

    /// Add one (x, y) pair. Pairs outside the x range or with a non-finite
    /// y are counted as skipped.
    pub fn fill(&mut self, x: f64, y: f64) {
        match self.find_bin(x) {
            Some(idx) if y.is_finite() => {
                let bin = &mut self.bins[idx];
                bin.entries += 1;
                bin.sum += y;
                bin.sum_sq += y * y;
            }
            _ => self.skipped += 1,
        }
    }

    pub fn fill_all<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        for (x, y) in pairs {
            self.fill(x, y);
        }
    }

    pub fn bins(&self) -> &[ProfileBin] {
        &self.bins
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Centre of bin `idx`.
    pub fn bin_center(&self, idx: usize) -> f64 {
        self.x_min + self.bin_width() * (idx as f64 + 0.5)
    }

    /// Format non-empty bins as `x | n | mean +/- error` rows with a bar
    /// proportional to the mean.
    pub fn format(&self) -> Result<String> {
        let mut output = String::new();
        if let Some(title) = &self.title {
            writeln!(output, "{title}")?;
            writeln!(output, "{}", "=".repeat(title.len()))?;
        }

        let header = format!(
            "{:>10} | {:>7} | {:>12} | {:>10} | Mean",
            "x", "Entries", "Mean", "Error"
        );
        writeln!(output, "{header}")?;
        writeln!(output, "{}", "-".repeat(header.len()))?;

        let max_mean = self
            .bins
            .iter()
            .filter_map(ProfileBin::mean)
            .map(f64::abs)
            .fold(0.0, f64::max);

        for (idx, bin) in self.bins.iter().enumerate() {
            let (Some(mean), Some(error)) = (bin.mean(), bin.error()) else {
                continue;
            };
            let bar_len = if max_mean > 0.0 {
                (mean.abs() / max_mean * 40.0).round() as usize
            } else {
                0
            };
            writeln!(
                output,
                "{:>10.3} | {:>7} | {:>12.4} | {:>10.4} | {}",
                self.bin_center(idx),
                bin.entries,
                mean,
                error,
                "*".repeat(bar_len)
            )?;
        }
        if self.skipped > 0 {
            writeln!(output, "Skipped (outside range): {}", self.skipped)?;
        }
        Ok(output)
    }

    pub fn print(&self) -> Result<()> {
        println!("{}", self.format()?);
        Ok(())
    }
}
