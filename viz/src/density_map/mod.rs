//! ASCII density maps of 2D point sets.
//!
//! The core renderer works in normalized `[0, 1]` coordinates: x runs left
//! to right, y bottom to top. Points outside that square are clamped to the
//! border; points with a NaN coordinate are skipped. Cells hold either point
//! counts or summed point weights.
//!
//! [`create_weighted_eta_phi_density_map`] maps particle directions
//! (pseudorapidity, azimuth) onto that square. The grid then forms equal bins
//! in phi over `[0, 2π)` and in eta over the given range, and directions
//! outside the eta range are left out.
//!
//! ```rust
//! use viz::density_map::{Point, DensityMapConfig, create_density_map};
//!
//! let points = vec![Point::new(0.1, 0.2), Point::new(0.5, 0.5), Point::new(0.5, 0.5)];
//! let config = DensityMapConfig {
//!     title: Some("Hits"),
//!     width: 20,
//!     height: 10,
//!     ..Default::default()
//! };
//! let map = create_density_map(&points, &config).unwrap();
//! assert!(map.contains("Hits"));
//! ```

use crate::{Result, VizError};
use std::f64::consts::TAU;
use std::fmt::Write;

/// Anything with a normalized 2D position.
pub trait PositionData {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

/// A point in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl PositionData for Point {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

/// Layout and labels of a density map.
#[derive(Debug, Clone)]
pub struct DensityMapConfig<'a> {
    pub title: Option<&'a str>,
    /// Label under the grid.
    pub x_label: Option<&'a str>,
    /// Label above the grid, for y = 1.
    pub y_top_label: Option<&'a str>,
    /// Label below the grid, for y = 0.
    pub y_bottom_label: Option<&'a str>,
    /// Characters from empty to densest; at least one.
    pub density_chars: &'a str,
    /// Grid columns.
    pub width: usize,
    /// Grid rows.
    pub height: usize,
}

impl Default for DensityMapConfig<'_> {
    fn default() -> Self {
        Self {
            title: None,
            x_label: None,
            y_top_label: None,
            y_bottom_label: None,
            density_chars: " .:#",
            width: 80,
            height: 24,
        }
    }
}

fn cell<T: PositionData>(point: &T, width: usize, height: usize) -> Option<(usize, usize)> {
    let (x, y) = (point.x(), point.y());
    if width == 0 || height == 0 || x.is_nan() || y.is_nan() {
        return None;
    }
    let col = ((x.clamp(0.0, 1.0) * width as f64) as usize).min(width - 1);
    let row = (((1.0 - y.clamp(0.0, 1.0)) * height as f64) as usize).min(height - 1);
    Some((row, col))
}

/// Count points per grid cell. Row 0 is the top of the map.
pub fn density_grid<T: PositionData>(points: &[T], width: usize, height: usize) -> Vec<Vec<u32>> {
    let mut grid = vec![vec![0u32; width]; height];
    for point in points {
        if let Some((row, col)) = cell(point, width, height) {
            grid[row][col] += 1;
        }
    }
    grid
}

/// Sum point weights per grid cell. Row 0 is the top of the map; non-finite
/// weights are skipped.
pub fn weighted_density_grid<T: PositionData>(
    points: &[T],
    weights: &[f64],
    width: usize,
    height: usize,
) -> Result<Vec<Vec<f64>>> {
    if points.len() != weights.len() {
        return Err(VizError::HistogramError(format!(
            "Got {} weights for {} points",
            weights.len(),
            points.len()
        )));
    }
    let mut grid = vec![vec![0.0; width]; height];
    for (point, &weight) in points.iter().zip(weights) {
        if !weight.is_finite() {
            continue;
        }
        if let Some((row, col)) = cell(point, width, height) {
            grid[row][col] += weight;
        }
    }
    Ok(grid)
}

fn check_config(config: &DensityMapConfig) -> Result<Vec<char>> {
    let chars: Vec<char> = config.density_chars.chars().collect();
    if chars.is_empty() {
        return Err(VizError::HistogramError(
            "Empty character set for density map".to_string(),
        ));
    }
    if config.width == 0 || config.height == 0 {
        return Err(VizError::HistogramError(
            "Density map needs a non-empty grid".to_string(),
        ));
    }
    Ok(chars)
}

fn render(
    grid: &[Vec<f64>],
    config: &DensityMapConfig,
    chars: &[char],
    peak: &str,
) -> Result<String> {
    let max_value = grid.iter().flatten().copied().fold(0.0, f64::max);

    let mut output = String::new();
    if let Some(title) = config.title {
        writeln!(output, "{title}")?;
        writeln!(output, "{}", "=".repeat(title.len()))?;
    }
    if let Some(label) = config.y_top_label {
        writeln!(output, "{label}")?;
    }

    let border = format!("  +{}+", "-".repeat(config.width));
    writeln!(output, "{border}")?;
    for row in grid {
        output.push_str("  |");
        for &value in row {
            let idx = if max_value > 0.0 && value > 0.0 {
                ((value / max_value) * (chars.len() - 1) as f64).round() as usize
            } else {
                0
            };
            output.push(chars[idx.min(chars.len() - 1)]);
        }
        output.push_str("|\n");
    }
    writeln!(output, "{border}")?;

    if let Some(label) = config.y_bottom_label {
        writeln!(output, "{label}")?;
    }
    if let Some(label) = config.x_label {
        writeln!(output, "  {label}")?;
    }
    writeln!(
        output,
        "  Legend: '{}' = empty, '{}' = densest ({peak})",
        chars[0],
        chars[chars.len() - 1],
    )?;

    Ok(output)
}

/// Render points as an ASCII density map.
pub fn create_density_map<T: PositionData>(
    points: &[T],
    config: &DensityMapConfig,
) -> Result<String> {
    let chars = check_config(config)?;
    let grid = density_grid(points, config.width, config.height);
    let max_count = grid.iter().flatten().copied().max().unwrap_or(0);
    let grid: Vec<Vec<f64>> = grid
        .into_iter()
        .map(|row| row.into_iter().map(f64::from).collect())
        .collect();
    render(&grid, config, &chars, &format!("{max_count} points"))
}

/// Render points as an ASCII map of summed weights.
pub fn create_weighted_density_map<T: PositionData>(
    points: &[T],
    weights: &[f64],
    config: &DensityMapConfig,
) -> Result<String> {
    let chars = check_config(config)?;
    let grid = weighted_density_grid(points, weights, config.width, config.height)?;
    let max_weight = grid.iter().flatten().copied().fold(0.0, f64::max);
    render(&grid, config, &chars, &format!("weight {max_weight:.4}"))
}

/// Summed weight of particle directions: azimuth `[0, 2π)` left to right,
/// pseudorapidity `eta_range.0` at the bottom to `eta_range.1` at the top.
/// Directions outside the eta range are left out.
pub fn create_weighted_eta_phi_density_map(
    eta_phi: &[(f64, f64)],
    weights: &[f64],
    eta_range: (f64, f64),
    width: usize,
    height: usize,
    chars: &str,
) -> Result<String> {
    let (eta_min, eta_max) = eta_range;
    if eta_min.is_nan() || eta_max.is_nan() || eta_max <= eta_min {
        return Err(VizError::HistogramError(format!(
            "Invalid eta range {eta_min}..{eta_max}"
        )));
    }
    if eta_phi.len() != weights.len() {
        return Err(VizError::HistogramError(format!(
            "Got {} weights for {} directions",
            weights.len(),
            eta_phi.len()
        )));
    }

    let (points, weights): (Vec<Point>, Vec<f64>) = eta_phi
        .iter()
        .zip(weights)
        .filter(|((eta, phi), _)| (eta_min..=eta_max).contains(eta) && phi.is_finite())
        .map(|(&(eta, phi), &w)| {
            let point = Point::new(
                phi.rem_euclid(TAU) / TAU,
                (eta - eta_min) / (eta_max - eta_min),
            );
            (point, w)
        })
        .unzip();

    let top = format!("eta = {eta_max:+.1}");
    let bottom = format!("eta = {eta_min:+.1}");
    let config = DensityMapConfig {
        title: Some("Weighted density (eta vs phi)"),
        x_label: Some("phi increases left to right (0 to 2pi)"),
        y_top_label: Some(&top),
        y_bottom_label: Some(&bottom),
        density_chars: chars,
        width,
        height,
    };
    create_weighted_density_map(&points, &weights, &config)
}
