//! Synthetic TrackML events written to disk.
//!
//! An [`EventFixture`] collects particles and the hits they leave, then
//! writes the four per-event CSV files in the raw TrackML column layout.
//! [`write_detectors`] writes a matching `detectors.csv` with one row per
//! module, centred on the first hit recorded on it.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

fn to_io(e: csv::Error) -> io::Error {
    io::Error::other(e)
}

/// One hit in a fixture. `particle_id` 0 is noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureHit {
    pub hit_id: u64,
    pub particle_id: u64,
    pub position: [f64; 3],
    pub momentum: [f64; 3],
    pub volume_id: u32,
    pub layer_id: u32,
    pub module_id: u32,
}

/// A synthetic event.
#[derive(Debug, Clone)]
pub struct EventFixture {
    pub event_id: String,
    pub particles: Vec<(u64, [f64; 3])>,
    pub hits: Vec<FixtureHit>,
}

impl EventFixture {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            particles: Vec::new(),
            hits: Vec::new(),
        }
    }

    /// Add a particle with momentum `[px, py, pz]` (GeV).
    pub fn particle(&mut self, particle_id: u64, momentum: [f64; 3]) -> &mut Self {
        self.particles.push((particle_id, momentum));
        self
    }

    /// Add a hit left by `particle_id`, carrying that particle's momentum.
    /// Hit ids are assigned in insertion order starting at 1.
    pub fn hit(
        &mut self,
        particle_id: u64,
        (volume_id, layer_id, module_id): (u32, u32, u32),
        position: [f64; 3],
    ) -> &mut Self {
        let momentum = self
            .particles
            .iter()
            .find(|(id, _)| *id == particle_id)
            .map(|(_, p)| *p)
            .unwrap_or([0.0; 3]);
        let hit_id = self.hits.len() as u64 + 1;
        self.hits.push(FixtureHit {
            hit_id,
            particle_id,
            position,
            momentum,
            volume_id,
            layer_id,
            module_id,
        });
        self
    }

    /// Add a hit of `particle_id` at each radius along +x, on layers
    /// 2, 4, 6, ... of `volume_id`, one module per hit.
    pub fn track_along_x(&mut self, particle_id: u64, volume_id: u32, radii: &[f64]) -> &mut Self {
        for (i, &r) in radii.iter().enumerate() {
            let layer_id = 2 * (i as u32 + 1);
            let module_id = self.hits.len() as u32 + 1;
            self.hit(particle_id, (volume_id, layer_id, module_id), [r, 0.0, 0.0]);
        }
        self
    }

    pub fn path(&self, dir: &Path, table: &str) -> PathBuf {
        dir.join(format!("{}-{table}.csv", self.event_id))
    }

    /// Write `<event>-{hits,cells,particles,truth}.csv` into `dir`.
    pub fn write(&self, dir: &Path) -> io::Result<()> {
        let mut hits = csv::Writer::from_path(self.path(dir, "hits")).map_err(to_io)?;
        hits.write_record(["hit_id", "x", "y", "z", "volume_id", "layer_id", "module_id"])
            .map_err(to_io)?;
        for h in &self.hits {
            hits.write_record([
                h.hit_id.to_string(),
                h.position[0].to_string(),
                h.position[1].to_string(),
                h.position[2].to_string(),
                h.volume_id.to_string(),
                h.layer_id.to_string(),
                h.module_id.to_string(),
            ])
            .map_err(to_io)?;
        }
        hits.flush()?;

        let mut cells = csv::Writer::from_path(self.path(dir, "cells")).map_err(to_io)?;
        cells.write_record(["hit_id", "ch0", "ch1", "value"]).map_err(to_io)?;
        for h in &self.hits {
            cells
                .write_record([h.hit_id.to_string(), "1".into(), "1".into(), "0.05".into()])
                .map_err(to_io)?;
        }
        cells.flush()?;

        let mut particles = csv::Writer::from_path(self.path(dir, "particles")).map_err(to_io)?;
        particles
            .write_record(["particle_id", "vx", "vy", "vz", "px", "py", "pz", "q", "nhits"])
            .map_err(to_io)?;
        for (id, p) in &self.particles {
            let nhits = self.hits.iter().filter(|h| h.particle_id == *id).count();
            particles
                .write_record([
                    id.to_string(),
                    "0".into(),
                    "0".into(),
                    "0".into(),
                    p[0].to_string(),
                    p[1].to_string(),
                    p[2].to_string(),
                    "1".into(),
                    nhits.to_string(),
                ])
                .map_err(to_io)?;
        }
        particles.flush()?;

        let mut truth = csv::Writer::from_path(self.path(dir, "truth")).map_err(to_io)?;
        truth
            .write_record([
                "hit_id",
                "particle_id",
                "tx",
                "ty",
                "tz",
                "tpx",
                "tpy",
                "tpz",
                "weight",
            ])
            .map_err(to_io)?;
        for h in &self.hits {
            truth
                .write_record([
                    h.hit_id.to_string(),
                    h.particle_id.to_string(),
                    h.position[0].to_string(),
                    h.position[1].to_string(),
                    h.position[2].to_string(),
                    h.momentum[0].to_string(),
                    h.momentum[1].to_string(),
                    h.momentum[2].to_string(),
                    "0.0001".into(),
                ])
                .map_err(to_io)?;
        }
        truth.flush()
    }
}

/// Write `detectors.csv` covering every module hit in `events`.
pub fn write_detectors(path: &Path, events: &[&EventFixture]) -> io::Result<()> {
    let mut modules: BTreeMap<(u32, u32, u32), [f64; 3]> = BTreeMap::new();
    for hit in events.iter().flat_map(|e| &e.hits) {
        modules
            .entry((hit.volume_id, hit.layer_id, hit.module_id))
            .or_insert(hit.position);
    }

    let mut wtr = csv::Writer::from_path(path).map_err(to_io)?;
    wtr.write_record(["volume_id", "layer_id", "module_id", "cx", "cy", "cz"])
        .map_err(to_io)?;
    for ((volume_id, layer_id, module_id), c) in modules {
        wtr.write_record([
            volume_id.to_string(),
            layer_id.to_string(),
            module_id.to_string(),
            c[0].to_string(),
            c[1].to_string(),
            c[2].to_string(),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()
}

/// The three-particle event used across the integration tests.
///
/// - particle 1: four barrel layers, radii increasing (accepted)
/// - particle 2: two barrel layers (too sparse)
/// - particle 3: three layers, radius goes 10, 30, 5 (backtrack)
///
/// plus one noise hit. All particles have pt 10 GeV.
pub fn three_track_event(event_id: &str) -> EventFixture {
    let mut event = EventFixture::new(event_id);
    event
        .particle(1, [10.0, 0.0, 1.0])
        .particle(2, [0.0, 10.0, 0.0])
        .particle(3, [6.0, 8.0, -2.0])
        .track_along_x(1, 8, &[32.0, 72.0, 116.0, 172.0])
        .track_along_x(2, 8, &[32.0, 72.0])
        .track_along_x(3, 8, &[10.0, 30.0, 5.0])
        .hit(0, (8, 2, 99), [40.0, 0.0, 0.0]);
    event
}
