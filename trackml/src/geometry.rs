//! Pixel detector geometry and azimuthal segmentation.
//!
//! The pixel volumes are cut into `N` equal-width phi sectors with edges at
//! `2πk/N`. A module belongs to the sector containing the azimuth of its
//! centroid. Sectors are half-open, `[edge_k, edge_{k+1})`, so a centroid
//! lying exactly on an edge is assigned to the sector above it (the same
//! convention as `numpy.digitize` with increasing bins).

use crate::error::{Result, TrackmlError};
use crate::event::{open_csv, require_columns, ModuleKey};
use crate::kinematics::normalize_phi;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::TAU;
use std::path::Path;

/// One row of `detectors.csv`. Orientation and pitch columns are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorModule {
    pub volume_id: u32,
    pub layer_id: u32,
    pub module_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub cz: f64,
}

impl DetectorModule {
    pub fn key(&self) -> ModuleKey {
        ModuleKey {
            volume_id: self.volume_id,
            layer_id: self.layer_id,
            module_id: self.module_id,
        }
    }

    /// Azimuth of the module centroid in `[0, 2π)`.
    pub fn phi(&self) -> f64 {
        normalize_phi(self.cy.atan2(self.cx))
    }
}

/// Load the detector geometry table.
pub fn load_detectors(path: &Path) -> Result<Vec<DetectorModule>> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| TrackmlError::csv(path, e))?
        .clone();
    require_columns(
        path,
        &headers,
        &[
            &["volume_id"],
            &["layer_id"],
            &["module_id"],
            &["cx"],
            &["cy"],
            &["cz"],
        ],
    )?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| TrackmlError::csv(path, e)))
        .collect()
}

/// Sector edges `2πk/N` for `k = 0..=N`.
pub fn phi_bin_edges(n_bins: usize) -> Vec<f64> {
    (0..=n_bins)
        .map(|k| TAU * k as f64 / n_bins as f64)
        .collect()
}

/// Sector index of `phi` given edges from [`phi_bin_edges`].
///
/// Returns the largest `k < N` with `edges[k] <= phi`, so a value on an edge
/// lands in the upper sector. Values below the first edge (including NaN)
/// fall into sector 0.
pub fn phi_bin(phi: f64, edges: &[f64]) -> usize {
    let n_bins = edges.len().saturating_sub(1);
    if n_bins == 0 {
        return 0;
    }
    edges[..n_bins]
        .partition_point(|&edge| edge <= phi)
        .saturating_sub(1)
}

/// A pixel module with its azimuth and sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentedModule {
    pub module: DetectorModule,
    pub phi: f64,
    pub bin: usize,
}

/// The pixel modules partitioned into `N` phi sectors.
///
/// Built once per bin count and consulted per hit. Construction is a pure
/// function of the geometry rows, `N` and the volume set.
#[derive(Debug, Clone)]
pub struct PhiSegmentation {
    n_bins: usize,
    edges: Vec<f64>,
    modules: Vec<SegmentedModule>,
    lookup: HashMap<ModuleKey, usize>,
}

impl PhiSegmentation {
    pub fn new(detectors: &[DetectorModule], n_bins: usize, volumes: &[u32]) -> Result<Self> {
        if n_bins == 0 {
            return Err(TrackmlError::InvalidConfig(
                "segmentation needs at least one phi bin".to_string(),
            ));
        }
        let edges = phi_bin_edges(n_bins);

        let modules: Vec<SegmentedModule> = detectors
            .iter()
            .filter(|m| volumes.contains(&m.volume_id))
            .map(|m| {
                let phi = m.phi();
                SegmentedModule {
                    module: *m,
                    phi,
                    bin: phi_bin(phi, &edges),
                }
            })
            .collect();

        let lookup = modules.iter().map(|s| (s.module.key(), s.bin)).collect();

        debug!(
            "Segmented {} pixel modules into {n_bins} phi bins",
            modules.len()
        );

        Ok(Self {
            n_bins,
            edges,
            modules,
            lookup,
        })
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn modules(&self) -> &[SegmentedModule] {
        &self.modules
    }

    /// Sector of a module, or `None` for modules outside the pixel volumes.
    pub fn bin_of(&self, key: &ModuleKey) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    /// Number of modules in each sector.
    pub fn modules_per_bin(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_bins];
        for m in &self.modules {
            counts[m.bin] += 1;
        }
        counts
    }

    /// Distinct layers present in each segmented volume.
    pub fn layers_by_volume(&self) -> BTreeMap<u32, BTreeSet<u32>> {
        let mut layers: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for m in &self.modules {
            layers
                .entry(m.module.volume_id)
                .or_default()
                .insert(m.module.layer_id);
        }
        layers
    }

    /// Module count per sector for each (volume, layer).
    pub fn modules_per_bin_by_layer(&self) -> BTreeMap<(u32, u32), Vec<usize>> {
        let mut table: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
        for m in &self.modules {
            table
                .entry((m.module.volume_id, m.module.layer_id))
                .or_insert_with(|| vec![0; self.n_bins])[m.bin] += 1;
        }
        table
    }

    /// The sector shared by every given module, if there is one.
    ///
    /// Stops at the first module that is unknown or lies in a different
    /// sector. An empty input has no sector.
    pub fn single_bin<I>(&self, keys: I) -> Option<usize>
    where
        I: IntoIterator<Item = ModuleKey>,
    {
        let mut shared = None;
        for key in keys {
            let bin = self.bin_of(&key)?;
            match shared {
                None => shared = Some(bin),
                Some(b) if b == bin => {}
                Some(_) => return None,
            }
        }
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use tempfile::TempDir;

    fn module(volume_id: u32, layer_id: u32, module_id: u32, phi: f64) -> DetectorModule {
        DetectorModule {
            volume_id,
            layer_id,
            module_id,
            cx: 50.0 * phi.cos(),
            cy: 50.0 * phi.sin(),
            cz: 0.0,
        }
    }

    fn ring() -> Vec<DetectorModule> {
        let mut modules = Vec::new();
        for i in 0..16 {
            let phi = (i as f64 + 0.5) * TAU / 16.0;
            modules.push(module(8, 2, i, phi));
            modules.push(module(8, 4, i, phi));
        }
        modules.push(module(12, 2, 0, 0.1));
        modules
    }

    #[test]
    fn test_edges() {
        let edges = phi_bin_edges(4);
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[0], 0.0);
        assert!((edges[2] - PI).abs() < 1e-12);
        assert!((edges[4] - TAU).abs() < 1e-12);
    }

    #[test]
    fn test_value_on_edge_goes_to_upper_bin() {
        let edges = phi_bin_edges(4);
        assert_eq!(phi_bin(0.0, &edges), 0);
        assert_eq!(phi_bin(edges[1], &edges), 1);
        assert_eq!(phi_bin(edges[2], &edges), 2);
        assert_eq!(phi_bin(edges[3], &edges), 3);
        assert_eq!(phi_bin(edges[1] - 1e-9, &edges), 0);
        assert_eq!(phi_bin(TAU - 1e-9, &edges), 3);
    }

    #[test]
    fn test_non_pixel_volumes_are_dropped() {
        let seg = PhiSegmentation::new(&ring(), 4, &[7, 8, 9]).unwrap();
        assert_eq!(seg.modules().len(), 32);
        assert_eq!(
            seg.bin_of(&ModuleKey {
                volume_id: 12,
                layer_id: 2,
                module_id: 0
            }),
            None
        );
    }

    #[test]
    fn test_modules_per_bin_uniform_ring() {
        let seg = PhiSegmentation::new(&ring(), 4, &[8]).unwrap();
        assert_eq!(seg.modules_per_bin(), vec![8, 8, 8, 8]);
        let per_layer = seg.modules_per_bin_by_layer();
        assert_eq!(per_layer[&(8, 2)], vec![4, 4, 4, 4]);
        let layers = seg.layers_by_volume();
        assert_eq!(layers[&8].iter().copied().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let modules = ring();
        for n in [2, 4, 6, 8, 10, 12, 14, 16] {
            let a = PhiSegmentation::new(&modules, n, &[8]).unwrap();
            let b = PhiSegmentation::new(&modules, n, &[8]).unwrap();
            let bins_a: Vec<usize> = a.modules().iter().map(|m| m.bin).collect();
            let bins_b: Vec<usize> = b.modules().iter().map(|m| m.bin).collect();
            assert_eq!(bins_a, bins_b);
            assert!(bins_a.iter().all(|&bin| bin < n));
        }
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(PhiSegmentation::new(&ring(), 0, &[8]).is_err());
    }

    #[test]
    fn test_single_bin_occupancy() {
        let seg = PhiSegmentation::new(&ring(), 4, &[8]).unwrap();
        let key = |layer_id, module_id| ModuleKey {
            volume_id: 8,
            layer_id,
            module_id,
        };

        // modules 0..3 sit in the first quarter
        assert_eq!(seg.single_bin([key(2, 0), key(4, 1), key(2, 3)]), Some(0));
        assert_eq!(seg.single_bin([key(2, 0), key(4, 4)]), None);
        assert_eq!(
            seg.single_bin([
                key(2, 0),
                ModuleKey {
                    volume_id: 12,
                    layer_id: 2,
                    module_id: 0
                }
            ]),
            None
        );
        assert_eq!(seg.single_bin(std::iter::empty()), None);
    }

    #[test]
    fn test_load_detectors_ignores_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detectors.csv");
        std::fs::write(
            &path,
            "volume_id,layer_id,module_id,cx,cy,cz,rot_xu,pitch_u\n\
             8,2,1,0,32,-10,1,0.05\n\
             13,4,7,-200,0,300,1,0.05\n",
        )
        .unwrap();
        let detectors = load_detectors(&path).unwrap();
        assert_eq!(detectors.len(), 2);
        assert!((detectors[0].phi() - PI / 2.0).abs() < 1e-12);
        assert!((detectors[1].phi() - PI).abs() < 1e-12);
    }
}
