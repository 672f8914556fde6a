//! Pixel-detector skims of raw events.
//!
//! A skim keeps only hits in the pixel volumes, the truth rows and cells of
//! those hits, and appends the derived kinematic columns the analysis plots
//! use. Skimmed events load through [`Event::load`] like raw ones.

use crate::error::{Result, TrackmlError};
use crate::event::{list_events, Event, Hit, Particle, TruthHit};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Volumes with an id at or above this are strip detectors.
pub const DEFAULT_MAX_VOLUME: u32 = 10;

#[derive(Debug, Serialize)]
struct SkimmedTruth {
    hit_id: u64,
    particle_id: u64,
    tx: f64,
    ty: f64,
    tz: f64,
    px: f64,
    py: f64,
    pz: f64,
    weight: f64,
    #[serde(rename = "tR")]
    t_r: f64,
    p: f64,
    pt: f64,
    eta: f64,
    phi: f64,
}

impl From<&TruthHit> for SkimmedTruth {
    fn from(t: &TruthHit) -> Self {
        let c = t.momentum().coords();
        Self {
            hit_id: t.hit_id,
            particle_id: t.particle_id,
            tx: t.tx,
            ty: t.ty,
            tz: t.tz,
            px: t.tpx,
            py: t.tpy,
            pz: t.tpz,
            weight: t.weight,
            t_r: t.radius(),
            p: c.p,
            pt: c.pt,
            eta: c.eta,
            phi: c.phi,
        }
    }
}

#[derive(Debug, Serialize)]
struct SkimmedParticle {
    particle_id: u64,
    vx: f64,
    vy: f64,
    vz: f64,
    px: f64,
    py: f64,
    pz: f64,
    q: i32,
    nhits: u32,
    p: f64,
    pt: f64,
    eta: f64,
    phi: f64,
}

impl From<&Particle> for SkimmedParticle {
    fn from(p: &Particle) -> Self {
        let c = p.coords();
        Self {
            particle_id: p.particle_id,
            vx: p.vx,
            vy: p.vy,
            vz: p.vz,
            px: p.px,
            py: p.py,
            pz: p.pz,
            q: p.q,
            nhits: p.nhits,
            p: c.p,
            pt: c.pt,
            eta: c.eta,
            phi: c.phi,
        }
    }
}

/// Hit counts before and after skimming one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkimReport {
    pub event: String,
    pub hits_in: usize,
    pub hits_kept: usize,
    pub truth_kept: usize,
}

/// Drop hits in volumes `>= max_volume` and everything attached to them.
/// Particles are kept as they are.
pub fn skim_event(event: &Event, max_volume: u32) -> Event {
    let hits: Vec<Hit> = event
        .hits
        .iter()
        .filter(|h| h.volume_id < max_volume)
        .copied()
        .collect();
    let kept: HashSet<u64> = hits.iter().map(|h| h.hit_id).collect();

    Event {
        id: event.id.clone(),
        truth: event
            .truth
            .iter()
            .filter(|t| kept.contains(&t.hit_id))
            .copied()
            .collect(),
        cells: event
            .cells
            .iter()
            .filter(|c| kept.contains(&c.hit_id))
            .copied()
            .collect(),
        particles: event.particles.clone(),
        hits,
    }
}

const TRUTH_HEADER: [&str; 14] = [
    "hit_id",
    "particle_id",
    "tx",
    "ty",
    "tz",
    "px",
    "py",
    "pz",
    "weight",
    "tR",
    "p",
    "pt",
    "eta",
    "phi",
];
const HITS_HEADER: [&str; 7] = ["hit_id", "x", "y", "z", "volume_id", "layer_id", "module_id"];
const PARTICLES_HEADER: [&str; 13] = [
    "particle_id",
    "vx",
    "vy",
    "vz",
    "px",
    "py",
    "pz",
    "q",
    "nhits",
    "p",
    "pt",
    "eta",
    "phi",
];
const CELLS_HEADER: [&str; 4] = ["hit_id", "ch0", "ch1", "value"];

/// Serialize `rows` to `path`. csv derives the header from the first row,
/// so an empty table gets `header` written explicitly.
fn write_table<S, I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let mut wtr = csv::Writer::from_path(path).map_err(|e| TrackmlError::csv(path, e))?;
    let mut written = 0usize;
    for row in rows {
        wtr.serialize(row).map_err(|e| TrackmlError::csv(path, e))?;
        written += 1;
    }
    if written == 0 {
        wtr.write_record(header)
            .map_err(|e| TrackmlError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| TrackmlError::io(path, e))
}

/// Write a skimmed event as `<out_dir>/<event>-{truth,hits,particles,cells}.csv`.
pub fn write_skimmed(event: &Event, out_dir: &Path) -> Result<()> {
    let path = |table: &str| out_dir.join(format!("{}-{table}.csv", event.id));

    if event.truth.is_empty() {
        warn!("{}: no truth rows survived the skim", event.id);
    }
    write_table(
        &path("truth"),
        &TRUTH_HEADER,
        event.truth.iter().map(SkimmedTruth::from),
    )?;
    write_table(&path("hits"), &HITS_HEADER, &event.hits)?;
    write_table(
        &path("particles"),
        &PARTICLES_HEADER,
        event.particles.iter().map(SkimmedParticle::from),
    )?;
    write_table(&path("cells"), &CELLS_HEADER, &event.cells)
}

/// Skim every event of `input` into `output`, creating it if needed.
pub fn skim_dataset(
    input: &Path,
    output: &Path,
    max_volume: u32,
    max_events: Option<usize>,
) -> Result<Vec<SkimReport>> {
    std::fs::create_dir_all(output).map_err(|e| TrackmlError::io(output, e))?;
    info!("Writing skims to {}", output.display());

    let mut events = list_events(input)?;
    if let Some(max) = max_events {
        events.truncate(max);
    }

    let mut reports = Vec::with_capacity(events.len());
    for event_id in &events {
        let event = Event::load(input, event_id)?;
        let skimmed = skim_event(&event, max_volume);
        write_skimmed(&skimmed, output)?;
        info!(
            "Skimmed {event_id}: kept {} / {} hits",
            skimmed.hits.len(),
            event.hits.len()
        );
        reports.push(SkimReport {
            event: event_id.clone(),
            hits_in: event.hits.len(),
            hits_kept: skimmed.hits.len(),
            truth_kept: skimmed.truth.len(),
        });
    }
    Ok(reports)
}
