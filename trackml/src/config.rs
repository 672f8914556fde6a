//! Analysis configuration.
//!
//! Every threshold and volume set used by the classifier, the segmenter and
//! the run loop lives in [`AnalysisConfig`]. Configs round-trip through JSON
//! so a run can be reproduced from the file written next to its output.

use crate::error::{Result, TrackmlError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixel volumes 7, 8 and 9 (negative endcap, barrel, positive endcap).
pub const DEFAULT_BARREL_VOLUMES: [u32; 3] = [7, 8, 9];

/// Order in which a track's truth hits are walked.
///
/// The radial-progress check is only meaningful when hits are in
/// propagation order. TrackML truth files list hits in an order that
/// already follows the particle, so `AsRecorded` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitOrdering {
    /// Keep the truth table row order.
    #[default]
    AsRecorded,
    /// Stable sort by distance from the origin.
    ByRadius,
}

impl std::str::FromStr for HitOrdering {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "as_recorded" | "as-recorded" => Ok(Self::AsRecorded),
            "by_radius" | "by-radius" => Ok(Self::ByRadius),
            other => Err(format!(
                "unknown hit ordering '{other}' (expected as_recorded or by_radius)"
            )),
        }
    }
}

impl std::fmt::Display for HitOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AsRecorded => write!(f, "as_recorded"),
            Self::ByRadius => write!(f, "by_radius"),
        }
    }
}

/// Thresholds and limits for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Volumes whose layers count towards `nLayersHit` and which the
    /// segmenter partitions.
    pub barrel_volumes: Vec<u32>,
    /// Minimum number of distinct barrel layers for a usable track.
    pub min_layers: usize,
    /// Radial steps at or below this size (mm) are treated as noise.
    pub radial_step_threshold: f64,
    /// Skip particles with pt below this value (GeV).
    pub pt_cut: Option<f64>,
    /// Bin counts studied by the segmenter.
    pub bin_counts: Vec<usize>,
    /// Stop after this many events.
    pub max_events: Option<usize>,
    /// Stop once this many tracks have been considered.
    pub max_tracks: Option<usize>,
    pub hit_ordering: HitOrdering,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            barrel_volumes: DEFAULT_BARREL_VOLUMES.to_vec(),
            min_layers: 3,
            radial_step_threshold: 10.0,
            pt_cut: None,
            bin_counts: vec![2, 4, 6, 8, 10, 12, 14, 16],
            max_events: None,
            max_tracks: None,
            hit_ordering: HitOrdering::AsRecorded,
        }
    }
}

impl AnalysisConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.barrel_volumes.is_empty() {
            return Err(TrackmlError::InvalidConfig(
                "barrel_volumes must not be empty".to_string(),
            ));
        }
        if self.min_layers == 0 {
            return Err(TrackmlError::InvalidConfig(
                "min_layers must be at least 1".to_string(),
            ));
        }
        if !self.radial_step_threshold.is_finite() || self.radial_step_threshold < 0.0 {
            return Err(TrackmlError::InvalidConfig(format!(
                "radial_step_threshold must be a non-negative number, got {}",
                self.radial_step_threshold
            )));
        }
        if let Some(cut) = self.pt_cut {
            if !cut.is_finite() || cut < 0.0 {
                return Err(TrackmlError::InvalidConfig(format!(
                    "pt_cut must be a non-negative number, got {cut}"
                )));
            }
        }
        if self.bin_counts.contains(&0) {
            return Err(TrackmlError::InvalidConfig(
                "bin_counts must all be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a config from JSON. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| TrackmlError::io(path, e))?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            TrackmlError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TrackmlError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| TrackmlError::io(path, e))
    }
}
