//! Test helpers for the TrackML analysis workspace
//!
//! Synthetic events are built with [`fixtures`]. A [`FixtureDataset`] writes
//! them into a temporary directory laid out like a TrackML dataset, so tests
//! can run the analysis, load a matching geometry and keep their reports next
//! to the input files.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod fixtures;

use fixtures::{three_track_event, write_detectors, EventFixture};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to create dataset directory: {0}")]
    TempDir(#[source] io::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TestHelperError>;

/// Synthetic events written to a temporary dataset directory.
///
/// The directory is removed when the dataset is dropped.
pub struct FixtureDataset {
    dir: TempDir,
    events: Vec<EventFixture>,
}

impl FixtureDataset {
    /// An empty dataset directory.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().map_err(TestHelperError::TempDir)?,
            events: Vec::new(),
        })
    }

    /// `n_events` copies of [`three_track_event`], named `event000000001`
    /// onwards.
    pub fn three_track(n_events: usize) -> Result<Self> {
        let mut dataset = Self::new()?;
        for i in 1..=n_events {
            dataset.add_event(three_track_event(&format!("event{i:09}")))?;
        }
        Ok(dataset)
    }

    /// Write the event's four tables and keep it for [`Self::write_detectors`].
    pub fn add_event(&mut self, event: EventFixture) -> Result<&mut Self> {
        event
            .write(self.dir.path())
            .map_err(|source| TestHelperError::Write {
                path: event.path(self.dir.path(), "hits"),
                source,
            })?;
        self.events.push(event);
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn events(&self) -> &[EventFixture] {
        &self.events
    }

    /// Write `detectors.csv` covering every module hit in the dataset and
    /// return its path.
    pub fn write_detectors(&self) -> Result<PathBuf> {
        let path = self.output_path("detectors.csv");
        let events: Vec<&EventFixture> = self.events.iter().collect();
        write_detectors(&path, &events).map_err(|source| TestHelperError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// A path inside the dataset directory for reports and CSV output.
    pub fn output_path<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.dir.path().join(name)
    }
}
