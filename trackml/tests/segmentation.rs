//! Phi segmentation of a detector geometry read from disk.

use std::f64::consts::PI;
use std::io::Write;
use tempfile::TempDir;
use trackml::config::DEFAULT_BARREL_VOLUMES;
use trackml::event::ModuleKey;
use trackml::geometry::{load_detectors, DetectorModule, PhiSegmentation};

/// Twelve modules per layer, centred between the multiples of pi/6, in the
/// three barrel volumes and one endcap volume.
fn write_geometry(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("detectors.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "volume_id,layer_id,module_id,cx,cy,cz,rot_xu").unwrap();
    for volume in [7, 8, 9, 12] {
        for layer in [2, 4] {
            for module in 0..12 {
                let phi = 2.0 * PI * (module as f64 + 0.5) / 12.0;
                let r = 30.0 * layer as f64;
                writeln!(
                    file,
                    "{volume},{layer},{},{},{},0,1",
                    module + 1,
                    r * phi.cos(),
                    r * phi.sin()
                )
                .unwrap();
            }
        }
    }
    path
}

#[test]
fn test_modules_spread_evenly() {
    let dir = TempDir::new().unwrap();
    let detectors = load_detectors(&write_geometry(&dir)).unwrap();
    assert_eq!(detectors.len(), 96);

    let seg = PhiSegmentation::new(&detectors, 4, &DEFAULT_BARREL_VOLUMES).unwrap();
    assert_eq!(seg.modules().len(), 72);
    assert_eq!(seg.modules_per_bin().iter().sum::<usize>(), 72);
    for count in seg.modules_per_bin() {
        assert_eq!(count, 18);
    }

    let layers = seg.layers_by_volume();
    assert_eq!(layers.len(), 3);
    assert!(layers.values().all(|l| l.len() == 2));
    assert!(!layers.contains_key(&12));

    let by_layer = seg.modules_per_bin_by_layer();
    assert_eq!(by_layer.len(), 6);
    assert_eq!(by_layer[&(8, 4)], vec![3, 3, 3, 3]);
}

#[test]
fn test_segmentation_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let detectors = load_detectors(&write_geometry(&dir)).unwrap();
    for n in [2, 6, 16] {
        let a = PhiSegmentation::new(&detectors, n, &DEFAULT_BARREL_VOLUMES).unwrap();
        let b = PhiSegmentation::new(&detectors, n, &DEFAULT_BARREL_VOLUMES).unwrap();
        assert_eq!(a.modules(), b.modules());
        assert_eq!(a.edges(), b.edges());
    }
}

#[test]
fn test_single_bin_containment() {
    let dir = TempDir::new().unwrap();
    let detectors = load_detectors(&write_geometry(&dir)).unwrap();
    let seg = PhiSegmentation::new(&detectors, 2, &DEFAULT_BARREL_VOLUMES).unwrap();

    let key = |volume_id, layer_id, module_id| ModuleKey {
        volume_id,
        layer_id,
        module_id,
    };
    assert_eq!(seg.single_bin([key(7, 2, 2), key(8, 4, 3)]), Some(0));
    assert_eq!(seg.single_bin([key(7, 2, 7), key(9, 2, 8)]), Some(1));
    assert_eq!(seg.single_bin([key(7, 2, 2), key(7, 2, 8)]), None);
    // endcap modules are not segmented
    assert_eq!(seg.single_bin([key(12, 2, 2)]), None);
    assert_eq!(seg.single_bin(std::iter::empty()), None);
}

#[test]
fn test_module_on_edge_goes_to_upper_sector() {
    let module = |module_id, cx, cy| DetectorModule {
        volume_id: 8,
        layer_id: 2,
        module_id,
        cx,
        cy,
        cz: 0.0,
    };
    let detectors = [module(1, 50.0, 0.0), module(2, -50.0, 0.0), module(3, 0.0, -50.0)];
    let seg = PhiSegmentation::new(&detectors, 2, &DEFAULT_BARREL_VOLUMES).unwrap();
    let bins: Vec<usize> = seg.modules().iter().map(|m| m.bin).collect();
    assert_eq!(bins, vec![0, 1, 1]);
}

#[test]
fn test_zero_bins_rejected() {
    let dir = TempDir::new().unwrap();
    let detectors = load_detectors(&write_geometry(&dir)).unwrap();
    assert!(PhiSegmentation::new(&detectors, 0, &DEFAULT_BARREL_VOLUMES).is_err());
}
