//! trackml - Track quality analysis for TrackML events
//!
//! This crate loads TrackML events (hits, cells, particles and truth
//! tables), groups truth hits into per-particle tracks and classifies them
//! against the barrel layers of the detector, including:
//!
//! - **Event** - per-event CSV loading, plain or gzip-compressed
//! - **Geometry** - phi segmentation of detector modules
//! - **Track** - assembling truth hits into tracks
//! - **Classify** - sparse and backtracking track rejection
//! - **Features** - per-track features of accepted tracks
//! - **Pipeline** - the event loop and run summary
//! - **Skim** - reducing a dataset to the inner volumes
//! - **Efficiency** - segment and truth efficiency of hit graphs
//!
//! # Example
//!
//! ```text
//! use trackml::config::AnalysisConfig;
//! use trackml::pipeline::run;
//!
//! let result = run(Path::new("train_100_events"), AnalysisConfig::default(), None)?;
//! println!("{}", result.summary);
//! ```

pub mod args;
pub mod classify;
pub mod config;
pub mod efficiency;
pub mod error;
pub mod event;
pub mod features;
pub mod geometry;
pub mod kinematics;
pub mod pipeline;
pub mod report;
pub mod skim;
pub mod stats;
pub mod track;

// Re-export commonly used types
pub use error::{Result, TrackmlError};
