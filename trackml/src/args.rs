//! Command-line arguments shared by the analysis binaries.

use crate::config::{AnalysisConfig, HitOrdering};
use crate::error::Result;
use clap::Args;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Parse a bin count range in "start:stop:step" format, stop inclusive.
pub fn parse_bin_range(s: &str) -> std::result::Result<Vec<usize>, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err("Range must be in format 'start:stop:step'".to_string());
    }

    let start = parts[0]
        .trim()
        .parse::<usize>()
        .map_err(|_| "Invalid start value".to_string())?;
    let stop = parts[1]
        .trim()
        .parse::<usize>()
        .map_err(|_| "Invalid stop value".to_string())?;
    let step = parts[2]
        .trim()
        .parse::<usize>()
        .map_err(|_| "Invalid step value".to_string())?;

    if step == 0 {
        return Err("Step cannot be zero".to_string());
    }
    if start > stop {
        return Err("Start must not be greater than stop".to_string());
    }

    Ok((start..=stop).step_by(step).collect())
}

/// List of phi bin counts.
///
/// Accepts either a range, "2:16:2", or a comma list, "4,8,16". Zero is
/// never a valid bin count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinCounts(pub Vec<usize>);

impl FromStr for BinCounts {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let counts = if s.contains(':') {
            parse_bin_range(s)?
        } else {
            s.split(',')
                .map(|part| {
                    part.trim()
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid bin count '{}'", part.trim()))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        if counts.is_empty() {
            return Err("At least one bin count is required".to_string());
        }
        if counts.contains(&0) {
            return Err("Bin counts must be at least 1".to_string());
        }
        Ok(BinCounts(counts))
    }
}

impl fmt::Display for BinCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Analysis settings. A `--config` file is read first and any flag given on
/// the command line overrides the matching field.
#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// JSON file with analysis settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Volume ids counted as pixel barrel (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub barrel_volumes: Option<Vec<u32>>,

    /// Minimum number of distinct barrel layers for a usable track
    #[arg(long)]
    pub min_layers: Option<usize>,

    /// Radial steps at or below this size (mm) are ignored by the backtrack check
    #[arg(long)]
    pub radial_step: Option<f64>,

    /// Skip particles with transverse momentum below this value (GeV)
    #[arg(long)]
    pub pt_cut: Option<f64>,

    /// Phi bin counts, "start:stop:step" or a comma list
    #[arg(long)]
    pub bins: Option<BinCounts>,

    /// Stop after this many events
    #[arg(long)]
    pub max_events: Option<usize>,

    /// Stop once this many tracks have been considered
    #[arg(long)]
    pub max_tracks: Option<usize>,

    /// Hit walk order: as_recorded or by_radius
    #[arg(long)]
    pub hit_ordering: Option<HitOrdering>,
}

impl AnalysisArgs {
    /// Build the effective configuration.
    pub fn resolve(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load_from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(volumes) = &self.barrel_volumes {
            config.barrel_volumes = volumes.clone();
        }
        if let Some(min_layers) = self.min_layers {
            config.min_layers = min_layers;
        }
        if let Some(step) = self.radial_step {
            config.radial_step_threshold = step;
        }
        if self.pt_cut.is_some() {
            config.pt_cut = self.pt_cut;
        }
        if let Some(bins) = &self.bins {
            config.bin_counts = bins.0.clone();
        }
        if self.max_events.is_some() {
            config.max_events = self.max_events;
        }
        if self.max_tracks.is_some() {
            config.max_tracks = self.max_tracks;
        }
        if let Some(ordering) = self.hit_ordering {
            config.hit_ordering = ordering;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::NamedTempFile;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        analysis: AnalysisArgs,
    }

    #[test]
    fn test_parse_bin_range() {
        assert_eq!(parse_bin_range("2:16:2").unwrap(), vec![2, 4, 6, 8, 10, 12, 14, 16]);
        assert_eq!(parse_bin_range("3:10:4").unwrap(), vec![3, 7]);
        assert!(parse_bin_range("2:16").is_err());
        assert!(parse_bin_range("2:16:0").is_err());
        assert!(parse_bin_range("16:2:2").is_err());
    }

    #[test]
    fn test_bin_counts_from_list() {
        let bins: BinCounts = "4, 8,16".parse().unwrap();
        assert_eq!(bins.0, vec![4, 8, 16]);
        assert_eq!(bins.to_string(), "4,8,16");
        assert!("0,4".parse::<BinCounts>().is_err());
        assert!("four".parse::<BinCounts>().is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--pt-cut",
            "5",
            "--bins",
            "4:8:4",
            "--barrel-volumes",
            "8,9",
            "--hit-ordering",
            "by_radius",
        ]);
        let config = cli.analysis.resolve().unwrap();
        assert_eq!(config.pt_cut, Some(5.0));
        assert_eq!(config.bin_counts, vec![4, 8]);
        assert_eq!(config.barrel_volumes, vec![8, 9]);
        assert_eq!(config.hit_ordering, HitOrdering::ByRadius);
        assert_eq!(config.min_layers, 3);
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = NamedTempFile::new().unwrap();
        let base = AnalysisConfig {
            min_layers: 5,
            max_events: Some(10),
            ..AnalysisConfig::default()
        };
        base.save_to_file(file.path()).unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let cli = TestCli::parse_from(["test", "--config", &path, "--max-events", "2"]);
        let config = cli.analysis.resolve().unwrap();
        assert_eq!(config.min_layers, 5);
        assert_eq!(config.max_events, Some(2));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = TestCli::parse_from(["test", "--min-layers", "0"]);
        assert!(cli.analysis.resolve().is_err());
    }
}
