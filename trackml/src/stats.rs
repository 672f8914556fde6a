//! Summary statistics for efficiency studies and reports

use serde::Serialize;
use std::fmt;

/// Arithmetic mean, or NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`), or NaN for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Calculate median of a slice of f64 values
///
/// NaN values are filtered out. For even-length data, returns the average of
/// the two middle values.
///
/// # Returns
///
/// * `Some(median)` - The median value
/// * `None` - If no valid values remain after filtering NaN
pub fn median(values: &[f64]) -> Option<f64> {
    let mut valid: Vec<f64> = values.iter().filter(|v| !v.is_nan()).copied().collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f64::total_cmp);

    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        Some((valid[mid - 1] + valid[mid]) / 2.0)
    } else {
        Some(valid[mid])
    }
}

/// Mean with its spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

impl MeanStd {
    pub fn from_samples(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            std: std_dev(values),
        }
    }
}

impl fmt::Display for MeanStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.p$} +/- {:.p$}", self.mean, self.std, p = p),
            None => write!(f, "{} +/- {}", self.mean, self.std),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(variance(&values), 4.0);
        assert_relative_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[]).is_nan());
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[f64::NAN, 1.0, 5.0, 3.0]), Some(3.0));
    }

    #[test]
    fn test_mean_std_display() {
        let ms = MeanStd::from_samples(&[1.0, 3.0]);
        assert_eq!(format!("{ms:.2}"), "2.00 +/- 1.00");
    }
}
