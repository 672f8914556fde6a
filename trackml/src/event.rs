//! Per-event TrackML tables.
//!
//! An event is four flat files sharing a prefix, e.g.
//! `event000001000-hits.csv`, `-cells.csv`, `-particles.csv` and
//! `-truth.csv`. Gzipped copies (`.csv.gz`) are read transparently. Columns
//! are matched by header name, so extra columns written by skimming or by a
//! dataframe index are ignored.

use crate::error::{Result, TrackmlError};
use crate::kinematics::{radius3, DetectorCoords, Momentum};
use flate2::read::GzDecoder;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Particle id carried by hits that no particle produced.
pub const NOISE_PARTICLE_ID: u64 = 0;

/// One detector hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub hit_id: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub volume_id: u32,
    pub layer_id: u32,
    pub module_id: u32,
}

impl Hit {
    pub fn module(&self) -> ModuleKey {
        ModuleKey {
            volume_id: self.volume_id,
            layer_id: self.layer_id,
            module_id: self.module_id,
        }
    }
}

/// Identifies one detector module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub volume_id: u32,
    pub layer_id: u32,
    pub module_id: u32,
}

/// One pixel cell contributing to a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub hit_id: u64,
    pub ch0: i64,
    pub ch1: i64,
    pub value: f64,
}

/// A simulated particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub particle_id: u64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    #[serde(default)]
    pub vz: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    #[serde(default)]
    pub q: i32,
    #[serde(default)]
    pub nhits: u32,
}

impl Particle {
    pub fn momentum(&self) -> Momentum {
        Momentum::new(self.px, self.py, self.pz)
    }

    pub fn pt(&self) -> f64 {
        self.momentum().pt()
    }

    pub fn coords(&self) -> DetectorCoords {
        self.momentum().coords()
    }
}

/// Ground-truth link from a hit to the particle that produced it.
///
/// Raw files name the true momentum `tpx, tpy, tpz`; skimmed files rename
/// them `px, py, pz`. Both spellings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthHit {
    pub hit_id: u64,
    pub particle_id: u64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    #[serde(alias = "px")]
    pub tpx: f64,
    #[serde(alias = "py")]
    pub tpy: f64,
    #[serde(alias = "pz")]
    pub tpz: f64,
    #[serde(default)]
    pub weight: f64,
}

impl TruthHit {
    /// Distance of the true hit position from the origin (`tR`).
    pub fn radius(&self) -> f64 {
        radius3(self.tx, self.ty, self.tz)
    }

    pub fn momentum(&self) -> Momentum {
        Momentum::new(self.tpx, self.tpy, self.tpz)
    }

    /// Pseudorapidity of the particle direction at this hit.
    pub fn eta(&self) -> f64 {
        self.momentum().eta()
    }

    /// Azimuth of the particle direction at this hit, in `[0, 2π)`.
    pub fn phi(&self) -> f64 {
        self.momentum().phi()
    }

    pub fn is_noise(&self) -> bool {
        self.particle_id == NOISE_PARTICLE_ID
    }
}

/// Which of the four per-event files a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Hits,
    Cells,
    Particles,
    Truth,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Hits => "hits",
            Table::Cells => "cells",
            Table::Particles => "particles",
            Table::Truth => "truth",
        }
    }

    /// Required headers. Inner slices list accepted spellings of one column.
    fn required_columns(&self) -> &'static [&'static [&'static str]] {
        match self {
            Table::Hits => &[
                &["hit_id"],
                &["x"],
                &["y"],
                &["z"],
                &["volume_id"],
                &["layer_id"],
                &["module_id"],
            ],
            Table::Cells => &[&["hit_id"], &["ch0"], &["ch1"], &["value"]],
            Table::Particles => &[&["particle_id"], &["px"], &["py"], &["pz"]],
            Table::Truth => &[
                &["hit_id"],
                &["particle_id"],
                &["tx"],
                &["ty"],
                &["tz"],
                &["tpx", "px"],
                &["tpy", "py"],
                &["tpz", "pz"],
            ],
        }
    }
}

/// All tables of one event.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub hits: Vec<Hit>,
    pub cells: Vec<Cell>,
    pub particles: Vec<Particle>,
    pub truth: Vec<TruthHit>,
}

impl Event {
    /// Load the four tables for `event_id` from `dir`.
    pub fn load(dir: &Path, event_id: &str) -> Result<Self> {
        let hits = read_table(&table_path(dir, event_id, Table::Hits)?, Table::Hits)?;
        let cells = read_table(&table_path(dir, event_id, Table::Cells)?, Table::Cells)?;
        let particles = read_table(
            &table_path(dir, event_id, Table::Particles)?,
            Table::Particles,
        )?;
        let truth = read_table(&table_path(dir, event_id, Table::Truth)?, Table::Truth)?;

        info!(
            "Loaded {event_id}: {} hits, {} cells, {} particles, {} truth rows",
            hits.len(),
            cells.len(),
            particles.len(),
            truth.len()
        );

        Ok(Self {
            id: event_id.to_string(),
            hits,
            cells,
            particles,
            truth,
        })
    }

    pub fn hit_index(&self) -> HashMap<u64, &Hit> {
        self.hits.iter().map(|h| (h.hit_id, h)).collect()
    }

    pub fn particle_index(&self) -> HashMap<u64, &Particle> {
        self.particles.iter().map(|p| (p.particle_id, p)).collect()
    }
}

/// Event ids present in `dir`, derived from the truth file names.
///
/// `event000001000-truth.csv` yields `event000001000`. The result is sorted
/// so runs visit events in a reproducible order.
pub fn list_events(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TrackmlError::io(dir, e))?;
    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TrackmlError::io(dir, e))?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains("truth") {
            continue;
        }
        let stem = name.split('.').next().unwrap_or_default();
        let id = stem.split('-').next().unwrap_or_default();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    ids.sort();
    ids.dedup();
    debug!("Found {} events in {}", ids.len(), dir.display());
    Ok(ids)
}

/// Locate `<event>-<table>.csv`, falling back to `.csv.gz`.
pub fn table_path(dir: &Path, event_id: &str, table: Table) -> Result<PathBuf> {
    let plain = dir.join(format!("{event_id}-{}.csv", table.name()));
    if plain.is_file() {
        return Ok(plain);
    }
    let gz = dir.join(format!("{event_id}-{}.csv.gz", table.name()));
    if gz.is_file() {
        return Ok(gz);
    }
    Err(TrackmlError::MissingEventFile {
        dir: dir.to_path_buf(),
        event: event_id.to_string(),
        table: table.name(),
    })
}

/// Open a CSV file, decompressing `.gz` files on the fly.
pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<Box<dyn Read>>> {
    let file = File::open(path).map_err(|e| TrackmlError::io(path, e))?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader))
}

/// Fail unless every required column is present under one of its names.
pub(crate) fn require_columns(
    path: &Path,
    headers: &csv::StringRecord,
    required: &[&[&str]],
) -> Result<()> {
    for spellings in required {
        if !spellings.iter().any(|name| headers.iter().any(|h| h == *name)) {
            return Err(TrackmlError::MissingColumn {
                path: path.to_path_buf(),
                column: spellings[0].to_string(),
            });
        }
    }
    Ok(())
}

/// Read every row of one event table.
pub fn read_table<T: DeserializeOwned>(path: &Path, table: Table) -> Result<Vec<T>> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| TrackmlError::csv(path, e))?
        .clone();
    require_columns(path, &headers, table.required_columns())?;

    reader
        .deserialize()
        .map(|row| row.map_err(|e| TrackmlError::csv(path, e)))
        .collect()
}
