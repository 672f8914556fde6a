//! Per-track features.
//!
//! Features are only computed for tracks the classifier accepted; the
//! extractor takes an [`AcceptedTrack`] and does no re-checking.

use crate::classify::AcceptedTrack;
use crate::error::{Result, TrackmlError};
use crate::event::Particle;
use crate::kinematics::delta_phi;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Derived scalars of one accepted track.
///
/// `d_r` combines the angular gaps, `sqrt(dEta² + dPhi²)`. It is not a
/// distance in the detector; the spatial extent of the track is `len`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Transverse momentum of the particle (GeV).
    pub pt: f64,
    #[serde(rename = "dEta")]
    pub d_eta: f64,
    #[serde(rename = "dPhi")]
    pub d_phi: f64,
    #[serde(rename = "dR")]
    pub d_r: f64,
    /// First-to-last hit distance (mm).
    pub len: f64,
    #[serde(rename = "nHits")]
    pub n_hits: usize,
    #[serde(rename = "nLayersHit")]
    pub n_layers_hit: usize,
    #[serde(rename = "nHitsPerLayer")]
    pub n_hits_per_layer: f64,
}

/// Compute the features of an accepted track.
///
/// `dEta` and `dPhi` compare the first and last truth hits using the
/// direction stored with each hit, not the particle's production direction.
pub fn extract(accepted: &AcceptedTrack<'_>, particle: &Particle) -> FeatureRow {
    let track = accepted.track();
    let n_hits = track.n_hits();
    let n_layers_hit = accepted.layers_hit().get();

    let (d_eta, d_phi, len) = match (track.first(), track.last()) {
        (Some(first), Some(last)) => {
            let [x0, y0, z0] = first.position();
            let [x1, y1, z1] = last.position();
            (
                (last.eta() - first.eta()).abs(),
                delta_phi(last.phi(), first.phi()),
                ((x1 - x0).powi(2) + (y1 - y0).powi(2) + (z1 - z0).powi(2)).sqrt(),
            )
        }
        _ => (0.0, 0.0, 0.0),
    };

    FeatureRow {
        pt: particle.pt(),
        d_eta,
        d_phi,
        d_r: d_eta.hypot(d_phi),
        len,
        n_hits,
        n_layers_hit,
        n_hits_per_layer: n_hits as f64 / n_layers_hit as f64,
    }
}

/// Columns of the feature table, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureColumn {
    Pt,
    DEta,
    DPhi,
    DR,
    Len,
    NHits,
    NLayersHit,
    NHitsPerLayer,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 8] = [
        FeatureColumn::Pt,
        FeatureColumn::DEta,
        FeatureColumn::DPhi,
        FeatureColumn::DR,
        FeatureColumn::Len,
        FeatureColumn::NHits,
        FeatureColumn::NLayersHit,
        FeatureColumn::NHitsPerLayer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Pt => "pt",
            FeatureColumn::DEta => "dEta",
            FeatureColumn::DPhi => "dPhi",
            FeatureColumn::DR => "dR",
            FeatureColumn::Len => "len",
            FeatureColumn::NHits => "nHits",
            FeatureColumn::NLayersHit => "nLayersHit",
            FeatureColumn::NHitsPerLayer => "nHitsPerLayer",
        }
    }

    pub fn value(&self, row: &FeatureRow) -> f64 {
        match self {
            FeatureColumn::Pt => row.pt,
            FeatureColumn::DEta => row.d_eta,
            FeatureColumn::DPhi => row.d_phi,
            FeatureColumn::DR => row.d_r,
            FeatureColumn::Len => row.len,
            FeatureColumn::NHits => row.n_hits as f64,
            FeatureColumn::NLayersHit => row.n_layers_hit as f64,
            FeatureColumn::NHitsPerLayer => row.n_hits_per_layer,
        }
    }
}

/// Growing table of features for every accepted track of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the features of an accepted track and append them.
    pub fn record(&mut self, accepted: &AcceptedTrack<'_>, particle: &Particle) -> &FeatureRow {
        self.rows.push(extract(accepted, particle));
        &self.rows[self.rows.len() - 1]
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One column as a vector of floats.
    pub fn column(&self, column: FeatureColumn) -> Vec<f64> {
        self.rows.iter().map(|r| column.value(r)).collect()
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> std::result::Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        if self.rows.is_empty() {
            wtr.write_record(FeatureColumn::ALL.iter().map(|c| c.name()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| TrackmlError::io(path, e))?;
        self.write_csv(file).map_err(|e| TrackmlError::csv(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Classification, QualityCuts};
    use crate::event::{ModuleKey, TruthHit};
    use crate::track::{Track, TrackHit};
    use approx::assert_relative_eq;
    use std::f64::consts::{PI, TAU};

    fn track_hit(i: u32, layer_id: u32, pos: [f64; 3], phi: f64, pz: f64) -> TrackHit {
        TrackHit {
            truth: TruthHit {
                hit_id: i as u64,
                particle_id: 9,
                tx: pos[0],
                ty: pos[1],
                tz: pos[2],
                tpx: phi.cos(),
                tpy: phi.sin(),
                tpz: pz,
                weight: 0.0,
            },
            module: ModuleKey {
                volume_id: 8,
                layer_id,
                module_id: i,
            },
        }
    }

    fn particle() -> Particle {
        Particle {
            particle_id: 9,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            px: 6.0,
            py: 8.0,
            pz: 1.0,
            q: 1,
            nhits: 5,
        }
    }

    fn accepted_features(track: &Track) -> FeatureRow {
        match classify(track, &QualityCuts::default()) {
            Classification::Accepted(accepted) => extract(&accepted, &particle()),
            Classification::Rejected(r) => panic!("unexpected rejection {r:?}"),
        }
    }

    #[test]
    fn test_extract_features() {
        let track = Track {
            particle_id: 9,
            hits: vec![
                track_hit(1, 2, [30.0, 0.0, 0.0], 0.2, 0.0),
                track_hit(2, 4, [70.0, 0.0, 0.0], 0.25, 0.5),
                track_hit(3, 4, [72.0, 0.0, 0.0], 0.3, 0.7),
                track_hit(4, 6, [110.0, 30.0, 0.0], 0.3, 1.0),
                track_hit(5, 8, [170.0, 0.0, 0.0], 0.3, 1.0),
            ],
        };
        let row = accepted_features(&track);

        assert_relative_eq!(row.pt, 10.0);
        assert_eq!(row.n_hits, 5);
        assert_eq!(row.n_layers_hit, 4);
        assert_relative_eq!(row.n_hits_per_layer, 1.25);
        assert_relative_eq!(row.len, 140.0);
        assert_relative_eq!(row.d_phi, 0.1, epsilon = 1e-12);
        // eta of a unit-pt momentum with pz = 1 is asinh(1)
        assert_relative_eq!(row.d_eta, 1.0f64.asinh(), epsilon = 1e-12);
        assert_relative_eq!(row.d_r, row.d_eta.hypot(row.d_phi));
    }

    #[test]
    fn test_dphi_wraps_across_zero() {
        let track = Track {
            particle_id: 9,
            hits: vec![
                track_hit(1, 2, [30.0, 0.0, 0.0], 0.05, 0.0),
                track_hit(2, 4, [70.0, 0.0, 0.0], 0.0, 0.0),
                track_hit(3, 6, [110.0, 0.0, 0.0], TAU - 0.05, 0.0),
            ],
        };
        let row = accepted_features(&track);
        assert_relative_eq!(row.d_phi, 0.1, epsilon = 1e-9);
        assert!(row.d_phi <= PI);
    }

    #[test]
    fn test_hits_per_layer_at_least_one() {
        let track = Track {
            particle_id: 9,
            hits: (0..6)
                .map(|i| track_hit(i, 2 + 2 * (i / 2), [30.0 + 20.0 * i as f64, 0.0, 0.0], 0.1, 0.0))
                .collect(),
        };
        let row = accepted_features(&track);
        assert_eq!(row.n_layers_hit, 3);
        assert!(row.n_hits_per_layer >= 1.0);
        assert_relative_eq!(row.n_hits_per_layer, 2.0);
    }

    #[test]
    fn test_csv_header_uses_analysis_names() {
        let mut table = FeatureTable::new();
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text.trim(),
            "pt,dEta,dPhi,dR,len,nHits,nLayersHit,nHitsPerLayer"
        );

        let track = Track {
            particle_id: 9,
            hits: vec![
                track_hit(1, 2, [30.0, 0.0, 0.0], 0.2, 0.0),
                track_hit(2, 4, [70.0, 0.0, 0.0], 0.2, 0.0),
                track_hit(3, 6, [110.0, 0.0, 0.0], 0.2, 0.0),
            ],
        };
        let Classification::Accepted(accepted) = classify(&track, &QualityCuts::default()) else {
            panic!("expected acceptance");
        };
        table.record(&accepted, &particle());
        assert_eq!(table.len(), 1);
        assert_eq!(table.column(FeatureColumn::NHits), vec![3.0]);

        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("pt,dEta,dPhi,dR,len,nHits,nLayersHit,nHitsPerLayer")
        );
        assert!(lines.next().unwrap().starts_with("10.0,"));
    }
}
