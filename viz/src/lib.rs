//! ASCII plotting for track analysis reports.
//!
//! Everything renders to plain text so reports can be printed to a terminal
//! or kept in a log next to the CSV output of a run.
//!
//! - [`histogram`]: counts or weights in explicit bins, with underflow and
//!   overflow
//! - [`profile`]: mean and standard error of y in bins of x
//! - [`density_map`]: 2D point density, plain or weighted, including an
//!   eta/phi view
//! - [`errorbar`]: values with error bars against a shared x axis, one
//!   column per series
//!
//! ```rust
//! use viz::histogram::Histogram;
//!
//! let mut hist = Histogram::new(vec![0.0, 1.0, 2.0, 5.0])?.with_title("pt [GeV]");
//! hist.add_all([0.4, 1.2, 3.3, 7.0]);
//! assert_eq!(hist.overflow(), 1);
//! println!("{}", hist.format()?);
//! # Ok::<(), viz::VizError>(())
//! ```

use std::fmt;
use thiserror::Error;

/// Errors raised while building or rendering a plot.
#[derive(Debug, Error)]
pub enum VizError {
    /// Invalid binning, range or plot configuration.
    #[error("Histogram error: {0}")]
    HistogramError(String),

    #[error("Formatting error: {0}")]
    FmtError(#[from] fmt::Error),
}

pub type Result<T> = std::result::Result<T, VizError>;

pub mod density_map;
pub mod errorbar;
pub mod histogram;
pub mod profile;
