//! Truth track assembly.
//!
//! A track is the subsequence of truth rows sharing one particle id, each
//! joined with the detector module of its hit.

use crate::config::HitOrdering;
use crate::error::{Result, TrackmlError};
use crate::event::{Event, Hit, ModuleKey, TruthHit, NOISE_PARTICLE_ID};
use std::collections::{BTreeSet, HashMap};

/// A truth hit together with the module that recorded it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackHit {
    pub truth: TruthHit,
    pub module: ModuleKey,
}

impl TrackHit {
    pub fn radius(&self) -> f64 {
        self.truth.radius()
    }

    pub fn eta(&self) -> f64 {
        self.truth.eta()
    }

    pub fn phi(&self) -> f64 {
        self.truth.phi()
    }

    /// True hit position (mm).
    pub fn position(&self) -> [f64; 3] {
        [self.truth.tx, self.truth.ty, self.truth.tz]
    }
}

/// The hits left by one particle, in walk order.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub particle_id: u64,
    pub hits: Vec<TrackHit>,
}

impl Track {
    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    pub fn first(&self) -> Option<&TrackHit> {
        self.hits.first()
    }

    pub fn last(&self) -> Option<&TrackHit> {
        self.hits.last()
    }

    pub fn radii(&self) -> impl Iterator<Item = f64> + '_ {
        self.hits.iter().map(TrackHit::radius)
    }

    pub fn modules(&self) -> impl Iterator<Item = ModuleKey> + '_ {
        self.hits.iter().map(|h| h.module)
    }

    /// Distinct (volume, layer) pairs hit within `volumes`.
    pub fn layers_hit(&self, volumes: &[u32]) -> usize {
        self.hits
            .iter()
            .filter(|h| volumes.contains(&h.module.volume_id))
            .map(|h| (h.module.volume_id, h.module.layer_id))
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn apply_ordering(&mut self, ordering: HitOrdering) {
        if ordering == HitOrdering::ByRadius {
            self.hits
                .sort_by(|a, b| a.radius().total_cmp(&b.radius()));
        }
    }
}

/// Projects an event's truth table onto particle ids.
///
/// With [`HitOrdering::AsRecorded`] the truth rows must already be in
/// propagation order; nothing is reordered.
pub struct TrackAssembler<'a> {
    truth: &'a [TruthHit],
    hits: HashMap<u64, &'a Hit>,
    ordering: HitOrdering,
}

impl<'a> TrackAssembler<'a> {
    pub fn new(event: &'a Event, ordering: HitOrdering) -> Self {
        Self {
            truth: &event.truth,
            hits: event.hit_index(),
            ordering,
        }
    }

    fn join(&self, truth: &TruthHit) -> Result<TrackHit> {
        let hit = self
            .hits
            .get(&truth.hit_id)
            .ok_or(TrackmlError::UnknownHit {
                hit_id: truth.hit_id,
            })?;
        Ok(TrackHit {
            truth: *truth,
            module: hit.module(),
        })
    }

    /// Assemble the track of one particle.
    ///
    /// Particle id 0 marks noise and is refused.
    pub fn assemble(&self, particle_id: u64) -> Result<Track> {
        if particle_id == NOISE_PARTICLE_ID {
            return Err(TrackmlError::ReservedParticleId);
        }
        let hits = self
            .truth
            .iter()
            .filter(|t| t.particle_id == particle_id)
            .map(|t| self.join(t))
            .collect::<Result<Vec<_>>>()?;

        let mut track = Track { particle_id, hits };
        track.apply_ordering(self.ordering);
        Ok(track)
    }

    /// Assemble every non-noise track in one pass over the truth table.
    ///
    /// Tracks come out in order of each particle's first truth row.
    pub fn assemble_all(&self) -> Result<Vec<Track>> {
        let mut slots: HashMap<u64, usize> = HashMap::new();
        let mut tracks: Vec<Track> = Vec::new();

        for truth in self.truth.iter().filter(|t| !t.is_noise()) {
            let hit = self.join(truth)?;
            let slot = *slots.entry(truth.particle_id).or_insert_with(|| {
                tracks.push(Track {
                    particle_id: truth.particle_id,
                    hits: Vec::new(),
                });
                tracks.len() - 1
            });
            tracks[slot].hits.push(hit);
        }

        for track in &mut tracks {
            track.apply_ordering(self.ordering);
        }
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(hit_id: u64, volume_id: u32, layer_id: u32) -> Hit {
        Hit {
            hit_id,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            volume_id,
            layer_id,
            module_id: hit_id as u32,
        }
    }

    fn truth(hit_id: u64, particle_id: u64, r: f64) -> TruthHit {
        TruthHit {
            hit_id,
            particle_id,
            tx: r,
            ty: 0.0,
            tz: 0.0,
            tpx: 1.0,
            tpy: 0.0,
            tpz: 0.0,
            weight: 0.0,
        }
    }

    fn event() -> Event {
        Event {
            id: "e".to_string(),
            hits: vec![
                hit(1, 8, 2),
                hit(2, 8, 4),
                hit(3, 8, 4),
                hit(4, 13, 2),
                hit(5, 8, 6),
                hit(6, 8, 2),
            ],
            cells: vec![],
            particles: vec![],
            truth: vec![
                truth(1, 11, 30.0),
                truth(6, 0, 40.0),
                truth(2, 22, 70.0),
                truth(5, 11, 120.0),
                truth(3, 11, 70.0),
                truth(4, 11, 600.0),
            ],
        }
    }

    #[test]
    fn test_assemble_keeps_row_order() {
        let event = event();
        let assembler = TrackAssembler::new(&event, HitOrdering::AsRecorded);
        let track = assembler.assemble(11).unwrap();
        let ids: Vec<u64> = track.hits.iter().map(|h| h.truth.hit_id).collect();
        assert_eq!(ids, vec![1, 5, 3, 4]);
        assert_eq!(track.n_hits(), 4);
        assert_eq!(track.first().unwrap().truth.hit_id, 1);
        assert_eq!(track.last().unwrap().truth.hit_id, 4);
    }

    #[test]
    fn test_assemble_by_radius() {
        let event = event();
        let assembler = TrackAssembler::new(&event, HitOrdering::ByRadius);
        let track = assembler.assemble(11).unwrap();
        let radii: Vec<f64> = track.radii().collect();
        assert_eq!(radii, vec![30.0, 70.0, 120.0, 600.0]);
    }

    #[test]
    fn test_noise_id_refused() {
        let event = event();
        let assembler = TrackAssembler::new(&event, HitOrdering::AsRecorded);
        assert!(matches!(
            assembler.assemble(0),
            Err(TrackmlError::ReservedParticleId)
        ));
    }

    #[test]
    fn test_layers_hit_counts_barrel_pairs_only() {
        let event = event();
        let assembler = TrackAssembler::new(&event, HitOrdering::AsRecorded);
        let track = assembler.assemble(11).unwrap();
        // (8,2), (8,6), (8,4); the volume 13 hit is outside the set
        assert_eq!(track.layers_hit(&[7, 8, 9]), 3);
        assert_eq!(track.layers_hit(&[13]), 1);
    }

    #[test]
    fn test_assemble_all_in_first_appearance_order() {
        let event = event();
        let assembler = TrackAssembler::new(&event, HitOrdering::AsRecorded);
        let tracks = assembler.assemble_all().unwrap();
        let ids: Vec<u64> = tracks.iter().map(|t| t.particle_id).collect();
        assert_eq!(ids, vec![11, 22]);
        assert_eq!(tracks[0], assembler.assemble(11).unwrap());
    }

    #[test]
    fn test_unknown_hit_is_an_error() {
        let mut event = event();
        event.truth.push(truth(99, 22, 10.0));
        let assembler = TrackAssembler::new(&event, HitOrdering::AsRecorded);
        assert!(matches!(
            assembler.assemble(22),
            Err(TrackmlError::UnknownHit { hit_id: 99 })
        ));
    }

    #[test]
    fn test_absent_particle_gives_empty_track() {
        let event = event();
        let assembler = TrackAssembler::new(&event, HitOrdering::AsRecorded);
        assert_eq!(assembler.assemble(12345).unwrap().n_hits(), 0);
    }
}
