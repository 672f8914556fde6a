//! Track quality classification.
//!
//! Two independent checks decide whether a truth track is usable:
//!
//! - **sparsity**: the track must cross at least `min_layers` distinct
//!   layers of the barrel volumes;
//! - **radial progress**: walking the hits in order, the distance from the
//!   origin must not move both outward and inward by more than the noise
//!   threshold. A track that does both is a backtrack, usually a looper or
//!   a mislabelled hit.
//!
//! Only [`classify`] can produce an [`AcceptedTrack`], which is what the
//! feature extractor requires.

use crate::config::AnalysisConfig;
use crate::track::Track;
use std::fmt;
use std::num::NonZeroUsize;

/// Thresholds applied by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityCuts {
    pub barrel_volumes: Vec<u32>,
    pub min_layers: usize,
    pub radial_step_threshold: f64,
}

impl Default for QualityCuts {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for QualityCuts {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            barrel_volumes: config.barrel_volumes.clone(),
            min_layers: config.min_layers,
            radial_step_threshold: config.radial_step_threshold,
        }
    }
}

/// Whether a radius sequence progresses in one direction.
///
/// Steps with `|step| <= threshold` are ignored. Returns `false` as soon as
/// both a large outward and a large inward step have been seen. Sequences
/// with fewer than two values have no steps and always pass.
pub fn forward_progress<I>(radii: I, threshold: f64) -> bool
where
    I: IntoIterator<Item = f64>,
{
    let mut radii = radii.into_iter();
    let Some(mut previous) = radii.next() else {
        return true;
    };

    let mut outward = false;
    let mut inward = false;
    for r in radii {
        let step = r - previous;
        previous = r;
        if step.abs() > threshold {
            if step > 0.0 {
                outward = true;
            } else {
                inward = true;
            }
            if outward && inward {
                return false;
            }
        }
    }
    true
}

/// Why a track was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    TooSparse,
    Backtrack,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TooSparse => "too_sparse",
            RejectReason::Backtrack => "backtrack",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rejected track. Both checks always run, so both flags may
/// be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub too_sparse: bool,
    pub backtrack: bool,
    pub layers_hit: usize,
}

impl Rejection {
    pub fn reasons(&self) -> impl Iterator<Item = RejectReason> {
        [
            self.too_sparse.then_some(RejectReason::TooSparse),
            self.backtrack.then_some(RejectReason::Backtrack),
        ]
        .into_iter()
        .flatten()
    }
}

/// A track that passed both quality checks.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedTrack<'a> {
    track: &'a Track,
    layers_hit: NonZeroUsize,
}

impl<'a> AcceptedTrack<'a> {
    pub fn track(&self) -> &'a Track {
        self.track
    }

    /// Distinct barrel layers crossed; never zero.
    pub fn layers_hit(&self) -> NonZeroUsize {
        self.layers_hit
    }
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy)]
pub enum Classification<'a> {
    Accepted(AcceptedTrack<'a>),
    Rejected(Rejection),
}

impl Classification<'_> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted(_))
    }
}

/// Run both quality checks on a track.
pub fn classify<'a>(track: &'a Track, cuts: &QualityCuts) -> Classification<'a> {
    let layers_hit = track.layers_hit(&cuts.barrel_volumes);
    let too_sparse = layers_hit < cuts.min_layers;
    let backtrack = !forward_progress(track.radii(), cuts.radial_step_threshold);

    match NonZeroUsize::new(layers_hit) {
        Some(layers) if !too_sparse && !backtrack => Classification::Accepted(AcceptedTrack {
            track,
            layers_hit: layers,
        }),
        _ => Classification::Rejected(Rejection {
            // zero layers is sparse even if min_layers were zero
            too_sparse: too_sparse || layers_hit == 0,
            backtrack,
            layers_hit,
        }),
    }
}
