//! Text plots of values with symmetric error bars against a shared x axis.
//!
//! Each row is one x value. Every series gets a column with its value and
//! error, followed by a strip where `o` marks the value and `-` covers
//! `value ± error`. All strips share one y range, so series can be compared
//! side by side.
//!
//! ```rust
//! use viz::errorbar::ErrorBarPlot;
//!
//! let plot = ErrorBarPlot::new()
//!     .with_title("Segment efficiency")
//!     .with_series("LP", vec![(0.5, 0.20, 0.05), (1.0, 0.35, 0.04)])
//!     .with_series("LP+", vec![(0.5, 0.25, 0.05), (1.0, 0.40, 0.03)]);
//! let text = plot.format()?;
//! assert!(text.contains("LP+"));
//! # Ok::<(), viz::VizError>(())
//! ```

use crate::{Result, VizError};
use std::fmt::Write;

/// One labelled series of `(x, y, y_error)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64, f64)>,
}

/// Error bar plot of one or more series.
#[derive(Debug, Clone)]
pub struct ErrorBarPlot {
    title: Option<String>,
    x_label: String,
    strip_width: usize,
    precision: usize,
    series: Vec<Series>,
}

impl Default for ErrorBarPlot {
    fn default() -> Self {
        Self {
            title: None,
            x_label: "x".to_string(),
            strip_width: 30,
            precision: 3,
            series: Vec::new(),
        }
    }
}

impl ErrorBarPlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Header of the x column.
    pub fn with_x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = label.into();
        self
    }

    /// Characters per series strip.
    pub fn with_strip_width(mut self, width: usize) -> Self {
        self.strip_width = width;
        self
    }

    /// Decimal places of values and errors.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_series(mut self, label: impl Into<String>, points: Vec<(f64, f64, f64)>) -> Self {
        self.series.push(Series {
            label: label.into(),
            points,
        });
        self
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Distinct x values over all series, ascending. NaN is dropped.
    pub fn x_values(&self) -> Vec<f64> {
        let mut xs: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .filter(|x| !x.is_nan())
            .collect();
        xs.sort_by(f64::total_cmp);
        xs.dedup();
        xs
    }

    /// Lowest and highest `y ± error` over all finite points. A range without
    /// spread is widened by 0.5 on each side.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let (lo, hi) = self
            .series
            .iter()
            .flat_map(|s| &s.points)
            .filter(|(_, y, err)| y.is_finite() && err.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y, err)| {
                (lo.min(y - err.abs()), hi.max(y + err.abs()))
            });
        if !lo.is_finite() {
            return None;
        }
        if hi > lo {
            Some((lo, hi))
        } else {
            Some((lo - 0.5, hi + 0.5))
        }
    }

    fn column(&self, y: f64, (lo, hi): (f64, f64)) -> usize {
        let last = self.strip_width - 1;
        let fraction = ((y - lo) / (hi - lo)).clamp(0.0, 1.0);
        ((fraction * last as f64).round() as usize).min(last)
    }

    fn strip(&self, y: f64, err: f64, range: (f64, f64)) -> String {
        let mut cells = vec![' '; self.strip_width];
        if y.is_finite() && err.is_finite() {
            let from = self.column(y - err.abs(), range);
            let to = self.column(y + err.abs(), range);
            for cell in &mut cells[from..=to] {
                *cell = '-';
            }
            cells[self.column(y, range)] = 'o';
        }
        cells.into_iter().collect()
    }

    /// Format the plot as a string
    pub fn format(&self) -> Result<String> {
        if self.series.is_empty() {
            return Err(VizError::HistogramError(
                "Error bar plot needs at least one series".to_string(),
            ));
        }
        if self.strip_width == 0 {
            return Err(VizError::HistogramError(
                "Error bar strips must be at least one character wide".to_string(),
            ));
        }

        let p = self.precision;
        let mut output = String::new();
        if let Some(title) = &self.title {
            writeln!(output, "{title}")?;
            writeln!(output, "{}", "=".repeat(title.len()))?;
        }

        let Some(range) = self.y_range() else {
            writeln!(output, "(no finite points)")?;
            return Ok(output);
        };

        let x_width = self.x_label.len().max(8);
        let value_width = 2 * (p + 3) + 5;
        let cell_width = value_width + 1 + self.strip_width;

        let mut header = format!("{:>x_width$} ", self.x_label);
        for series in &self.series {
            write!(header, "| {:<cell_width$} ", series.label)?;
        }
        writeln!(output, "{}", header.trim_end())?;
        let mut scale = format!("{:>x_width$} ", "");
        for _ in &self.series {
            let lo = format!("{:.p$}", range.0);
            let hi = format!("{:.p$}", range.1);
            let gap = self.strip_width.saturating_sub(lo.len() + hi.len()).max(1);
            write!(
                scale,
                "| {:value_width$} {lo}{}{hi} ",
                "",
                " ".repeat(gap)
            )?;
        }
        writeln!(output, "{}", scale.trim_end())?;
        writeln!(output, "{}", "-".repeat(header.trim_end().len()))?;

        for x in self.x_values() {
            let mut row = format!("{x:>x_width$.2} ");
            for series in &self.series {
                match series.points.iter().find(|pt| pt.0 == x) {
                    Some(&(_, y, err)) => {
                        let value = format!("{y:.p$} +/- {err:.p$}");
                        write!(
                            row,
                            "| {value:>value_width$} {} ",
                            self.strip(y, err, range)
                        )?;
                    }
                    None => write!(row, "| {:>value_width$} {} ", "-", " ".repeat(self.strip_width))?,
                }
            }
            writeln!(output, "{}", row.trim_end())?;
        }
        Ok(output)
    }

    /// Print the plot to stdout
    pub fn print(&self) -> Result<()> {
        println!("{}", self.format()?);
        Ok(())
    }
}
