//! Event loop: load → assemble → classify → extract.
//!
//! [`Analysis`] owns everything that accumulates across events: the run
//! counters, the feature table and the optional single-bin occupancy tallies.
//! It is created at the start of a run and consumed by [`Analysis::finish`].

use crate::classify::{classify, Classification, QualityCuts};
use crate::config::AnalysisConfig;
use crate::error::{Result, TrackmlError};
use crate::event::{list_events, Event};
use crate::features::FeatureTable;
use crate::geometry::{DetectorModule, PhiSegmentation};
use crate::track::TrackAssembler;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Run-level counters.
///
/// `total` counts tracks handed to the classifier. Particles removed by the
/// pt cut are tallied in `below_pt_cut` and are not part of `total`. A track
/// failing both checks counts in both `too_sparse` and `backtrack`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub total: usize,
    pub too_sparse: usize,
    pub backtrack: usize,
    pub accepted: usize,
    pub below_pt_cut: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " --> Events processed: {}", self.events)?;
        if self.below_pt_cut > 0 {
            writeln!(
                f,
                " --> Particles below the pt cut: {}",
                self.below_pt_cut
            )?;
        }
        writeln!(
            f,
            " --> There were {} / {} backtracks!",
            self.backtrack, self.total
        )?;
        writeln!(
            f,
            " --> There were {} / {} sparse tracks!",
            self.too_sparse, self.total
        )?;
        write!(
            f,
            " --> Good tracks analyzed: {} / {}",
            self.accepted, self.total
        )
    }
}

/// Accepted tracks contained in a single phi sector, for one bin count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SingleBinCount {
    pub n_bins: usize,
    pub checked: usize,
    pub contained: usize,
}

impl SingleBinCount {
    pub fn fraction(&self) -> f64 {
        if self.checked == 0 {
            0.0
        } else {
            self.contained as f64 / self.checked as f64
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub summary: RunSummary,
    pub features: FeatureTable,
    pub single_bin: Vec<SingleBinCount>,
}

/// State of one analysis run.
pub struct Analysis {
    config: AnalysisConfig,
    cuts: QualityCuts,
    segmentations: Vec<PhiSegmentation>,
    result: AnalysisResult,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let cuts = QualityCuts::from(&config);
        Ok(Self {
            config,
            cuts,
            segmentations: Vec::new(),
            result: AnalysisResult::default(),
        })
    }

    /// Also tally single-sector occupancy of accepted tracks for every
    /// configured bin count.
    pub fn with_geometry(mut self, detectors: &[DetectorModule]) -> Result<Self> {
        self.segmentations = self
            .config
            .bin_counts
            .iter()
            .map(|&n| PhiSegmentation::new(detectors, n, &self.config.barrel_volumes))
            .collect::<Result<_>>()?;
        self.result.single_bin = self
            .segmentations
            .iter()
            .map(|s| SingleBinCount {
                n_bins: s.n_bins(),
                checked: 0,
                contained: 0,
            })
            .collect();
        Ok(self)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn summary(&self) -> &RunSummary {
        &self.result.summary
    }

    /// Whether the track limit has been reached.
    pub fn is_done(&self) -> bool {
        self.config
            .max_tracks
            .is_some_and(|max| self.result.summary.total >= max)
    }

    /// Add one event's tracks to the run.
    pub fn process_event(&mut self, event: &Event) -> Result<()> {
        info!("Processing {}", event.id);
        self.result.summary.events += 1;

        let particles = event.particle_index();
        let tracks = TrackAssembler::new(event, self.config.hit_ordering).assemble_all()?;

        for track in &tracks {
            if self.is_done() {
                break;
            }

            let particle = particles
                .get(&track.particle_id)
                .copied()
                .ok_or(TrackmlError::UnknownParticle {
                    particle_id: track.particle_id,
                })?;

            if let Some(cut) = self.config.pt_cut {
                if particle.pt() < cut {
                    self.result.summary.below_pt_cut += 1;
                    continue;
                }
            }

            let summary = &mut self.result.summary;
            summary.total += 1;

            match classify(track, &self.cuts) {
                Classification::Accepted(accepted) => {
                    summary.accepted += 1;
                    self.result.features.record(&accepted, particle);

                    for (seg, count) in self
                        .segmentations
                        .iter()
                        .zip(self.result.single_bin.iter_mut())
                    {
                        count.checked += 1;
                        if seg.single_bin(track.modules()).is_some() {
                            count.contained += 1;
                        }
                    }
                }
                Classification::Rejected(rejection) => {
                    if rejection.too_sparse {
                        summary.too_sparse += 1;
                    }
                    if rejection.backtrack {
                        summary.backtrack += 1;
                    }
                    debug!(
                        "{}: rejected particle {} ({} hits, {} layers): {}",
                        event.id,
                        track.particle_id,
                        track.n_hits(),
                        rejection.layers_hit,
                        rejection
                            .reasons()
                            .map(|r| r.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
        }
        Ok(())
    }

    /// Event ids of `dataset` in processing order, cut to `max_events`.
    pub fn event_ids(&self, dataset: &Path) -> Result<Vec<String>> {
        let mut events = list_events(dataset)?;
        if events.is_empty() {
            warn!("No events found in {}", dataset.display());
        }
        if let Some(max) = self.config.max_events {
            events.truncate(max);
        }
        Ok(events)
    }

    /// Load and process `event_ids` from `dataset` in order until the track
    /// limit is reached. `on_event` is called after each processed event.
    ///
    /// Returns the number of events processed.
    pub fn process_events<F>(
        &mut self,
        dataset: &Path,
        event_ids: &[String],
        mut on_event: F,
    ) -> Result<usize>
    where
        F: FnMut(&Event),
    {
        let mut processed = 0;
        for event_id in event_ids {
            if self.is_done() {
                info!("Track limit reached after {processed} events");
                break;
            }
            let event = Event::load(dataset, event_id)?;
            self.process_event(&event)?;
            on_event(&event);
            processed += 1;
        }
        Ok(processed)
    }

    pub fn finish(self) -> AnalysisResult {
        self.result
    }
}

/// Analyse the events found in `dataset`, optionally with detector geometry
/// for the single-sector study.
pub fn run(
    dataset: &Path,
    config: AnalysisConfig,
    detectors: Option<&[DetectorModule]>,
) -> Result<AnalysisResult> {
    let mut analysis = Analysis::new(config)?;
    if let Some(detectors) = detectors {
        analysis = analysis.with_geometry(detectors)?;
    }
    let events = analysis.event_ids(dataset)?;
    analysis.process_events(dataset, &events, |_| {})?;
    Ok(analysis.finish())
}
