//! Error types for the TrackML analysis crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or analysing TrackML data.
///
/// Track rejections by the quality classifier are not errors; they are
/// counted in the run summary. Everything here aborts the run.
#[derive(Debug, Error)]
pub enum TrackmlError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("no {table} file for event {event} in {dir}")]
    MissingEventFile {
        dir: PathBuf,
        event: String,
        table: &'static str,
    },

    #[error("truth row references hit {hit_id} which is not in the hits table")]
    UnknownHit { hit_id: u64 },

    #[error("particle {particle_id} appears in truth but not in the particles table")]
    UnknownParticle { particle_id: u64 },

    #[error("particle id 0 is reserved for noise hits and has no track")]
    ReservedParticleId,

    #[error("graph file {path}: {reason}")]
    Graph { path: PathBuf, reason: String },

    #[error("truth table {path}, line {line}: {reason}")]
    TruthTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("no truth entry for event '{event}'")]
    MissingTruthEntry { event: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrackmlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackmlError>;
