//! Skimmed datasets stay loadable and analysable.

use tempfile::TempDir;
use test_helpers::fixtures::{three_track_event, EventFixture};
use trackml::config::AnalysisConfig;
use trackml::event::{list_events, Event};
use trackml::pipeline::run;
use trackml::skim::{skim_dataset, DEFAULT_MAX_VOLUME};

fn event_with_outer_hits(event_id: &str) -> EventFixture {
    let mut event = three_track_event(event_id);
    event
        .particle(4, [3.0, 4.0, 0.0])
        .track_along_x(4, 13, &[260.0, 360.0, 500.0]);
    event
}

#[test]
fn test_skim_drops_outer_volumes() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    event_with_outer_hits("event000000001")
        .write(input.path())
        .unwrap();

    let reports = skim_dataset(input.path(), output.path(), DEFAULT_MAX_VOLUME, None).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].hits_in, 13);
    assert_eq!(reports[0].hits_kept, 10);
    assert_eq!(reports[0].truth_kept, 10);

    let skimmed = Event::load(output.path(), "event000000001").unwrap();
    assert_eq!(skimmed.hits.len(), 10);
    assert!(skimmed.hits.iter().all(|h| h.volume_id < DEFAULT_MAX_VOLUME));
    assert_eq!(skimmed.cells.len(), 10);
    assert_eq!(skimmed.particles.len(), 4);
}

#[test]
fn test_skimmed_dataset_gives_same_summary() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for i in 1..=2 {
        event_with_outer_hits(&format!("event{i:09}"))
            .write(input.path())
            .unwrap();
    }
    skim_dataset(input.path(), output.path(), DEFAULT_MAX_VOLUME, None).unwrap();
    assert_eq!(
        list_events(output.path()).unwrap(),
        list_events(input.path()).unwrap()
    );

    let before = run(input.path(), AnalysisConfig::default(), None).unwrap();
    let after = run(output.path(), AnalysisConfig::default(), None).unwrap();
    // the outer particle loses all its hits and no longer forms a track
    assert_eq!(before.summary.total, 8);
    assert_eq!(after.summary.total, 6);
    assert_eq!(before.summary.accepted, after.summary.accepted);
    assert_eq!(before.features, after.features);
}

#[test]
fn test_skim_respects_max_events() {
    let input = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let output = scratch.path().join("nested").join("skims");
    for i in 1..=3 {
        three_track_event(&format!("event{i:09}"))
            .write(input.path())
            .unwrap();
    }
    let reports = skim_dataset(input.path(), &output, DEFAULT_MAX_VOLUME, Some(2)).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(list_events(&output).unwrap().len(), 2);
}
