//! Text plots of a finished feature table, of the pt flow of an event's
//! particles and of graph efficiency against the pt cut.

use crate::efficiency::{EfficiencyMetric, EfficiencyRun};
use crate::event::Particle;
use crate::features::{FeatureColumn, FeatureTable};
use crate::kinematics::DetectorCoords;
use viz::density_map::create_weighted_eta_phi_density_map;
use viz::errorbar::ErrorBarPlot;
use viz::histogram::Histogram;
use viz::profile::Profile;

/// pt bin edges (GeV), fine at low pt and coarse in the tail.
pub const PT_EDGES: [f64; 10] = [0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 60.0, 100.0, 150.0];

/// Bins of the len histogram, spanning the observed range.
pub const LEN_BINS: usize = 15;

/// Bins of every feature-vs-pt profile.
pub const PROFILE_BINS: usize = 70;

/// Features profiled against pt.
pub const PROFILED: [FeatureColumn; 7] = [
    FeatureColumn::NHits,
    FeatureColumn::NLayersHit,
    FeatureColumn::NHitsPerLayer,
    FeatureColumn::Len,
    FeatureColumn::DR,
    FeatureColumn::DEta,
    FeatureColumn::DPhi,
];

/// Eta range of the pt-flow heat map.
pub const ETA_RANGE: (f64, f64) = (-5.0, 5.0);

/// Particles below this pt (GeV) make up the low-pt part of the pt flow.
pub const PT_SPLIT: f64 = 5.0;

/// Upper edge (GeV) of the high-pt histogram.
pub const PT_HIGH_MAX: f64 = 105.0;

/// Edges of each pt-flow pt histogram, spaced evenly.
pub const PT_FLOW_EDGES: usize = 50;

/// Bins of the weighted phi and eta histograms, spanning the observed range.
pub const ANGLE_BINS: usize = 25;

/// Edges per axis of the eta/phi heat map.
pub const HEAT_MAP_EDGES: usize = 15;

const DENSITY_CHARS: &str = " .:-=+*#%@";

fn filled(hist: Histogram, title: &str, values: Vec<f64>) -> Histogram {
    let mut hist = hist.with_title(title);
    hist.add_all(values);
    hist
}

/// Histograms of pt, nHits, nLayersHit, nHitsPerLayer and len.
///
/// The len histogram is left out when the table has no spread in len.
pub fn feature_histograms(table: &FeatureTable) -> viz::Result<Vec<Histogram>> {
    let mut hists = vec![
        filled(
            Histogram::new(PT_EDGES.to_vec())?,
            "pt [GeV]",
            table.column(FeatureColumn::Pt),
        ),
        filled(
            Histogram::new_stepped(0.0, 19.0, 1.0)?,
            "nHits",
            table.column(FeatureColumn::NHits),
        ),
        filled(
            Histogram::new_stepped(0.0, 19.0, 1.0)?,
            "nLayersHit",
            table.column(FeatureColumn::NLayersHit),
        ),
        filled(
            Histogram::new_stepped(1.0, 5.0, 0.5)?,
            "nHitsPerLayer",
            table.column(FeatureColumn::NHitsPerLayer),
        ),
    ];

    let len = table.column(FeatureColumn::Len);
    let (lo, hi) = len
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo.is_finite() && hi > lo {
        hists.push(filled(
            Histogram::new_equal_bins(lo, hi, LEN_BINS)?,
            "len [mm]",
            len,
        ));
    }
    Ok(hists)
}

/// Profiles of each feature in [`PROFILED`] against pt. Empty for an empty
/// table.
pub fn feature_profiles(table: &FeatureTable) -> viz::Result<Vec<Profile>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let pt = table.column(FeatureColumn::Pt);
    PROFILED
        .iter()
        .map(|&column| -> viz::Result<Profile> {
            let mut profile = Profile::spanning(&pt, PROFILE_BINS)?
                .with_title(format!("{} vs pt", column.name()));
            profile.fill_all(pt.iter().copied().zip(table.column(column)));
            Ok(profile)
        })
        .collect()
}

/// Every histogram and profile of the table, one after another.
pub fn render_feature_report(table: &FeatureTable) -> viz::Result<String> {
    let mut out = String::new();
    for hist in feature_histograms(table)? {
        out.push_str(&hist.format()?);
        out.push('\n');
    }
    for profile in feature_profiles(table)? {
        out.push_str(&profile.format()?);
        out.push('\n');
    }
    Ok(out)
}

/// `n` evenly spaced values from `lo` to `hi` inclusive, `n >= 2`.
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { hi } else { lo + step * i as f64 })
        .collect()
}

/// Weighted histogram with `n_bins` equal bins over the finite range of
/// `values`. A single distinct value gets a unit-wide range around it.
fn weighted_spanning(
    values: &[f64],
    weights: &[f64],
    n_bins: usize,
    title: &str,
) -> viz::Result<Option<Histogram>> {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return Ok(None);
    }
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
    let mut hist = Histogram::new_equal_bins(lo, hi, n_bins)?.with_title(title);
    hist.add_all_weighted(values.iter().copied().zip(weights.iter().copied()));
    Ok(Some(hist))
}

/// Where the transverse momentum of an event goes.
///
/// Particles are split at [`PT_SPLIT`]. The low-pt particles are weighted by
/// their share of the summed low-pt pt, and those weights fill the phi and
/// eta histograms and the eta/phi heat map.
#[derive(Debug, Clone)]
pub struct PtFlow {
    pub low_pt: Histogram,
    pub high_pt: Histogram,
    /// `None` without low-pt particles.
    pub phi: Option<Histogram>,
    pub eta: Option<Histogram>,
    /// `HEAT_MAP_EDGES - 1` bins per axis: phi over `[0, 2π)`, eta over
    /// [`ETA_RANGE`]. Directions outside the eta range are left out.
    pub heat_map: String,
}

pub fn pt_flow(particles: &[Particle]) -> viz::Result<PtFlow> {
    let coords: Vec<DetectorCoords> = particles.iter().map(Particle::coords).collect();
    let (low, high): (Vec<DetectorCoords>, Vec<DetectorCoords>) =
        coords.into_iter().partition(|c| c.pt < PT_SPLIT);

    let mut low_pt = Histogram::new(linspace(0.0, PT_SPLIT, PT_FLOW_EDGES))?
        .with_title(format!("pt < {PT_SPLIT} GeV"));
    low_pt.add_all(low.iter().map(|c| c.pt));
    let mut high_pt = Histogram::new(linspace(PT_SPLIT, PT_HIGH_MAX, PT_FLOW_EDGES))?
        .with_title(format!("pt >= {PT_SPLIT} GeV"));
    high_pt.add_all(high.iter().map(|c| c.pt));

    let norm: f64 = low.iter().map(|c| c.pt).sum();
    let weights: Vec<f64> = low
        .iter()
        .map(|c| if norm > 0.0 { c.pt / norm } else { 0.0 })
        .collect();

    let phis: Vec<f64> = low.iter().map(|c| c.phi).collect();
    let etas: Vec<f64> = low.iter().map(|c| c.eta).collect();
    let phi = weighted_spanning(
        &phis,
        &weights,
        ANGLE_BINS,
        &format!("pt fraction vs phi (pt < {PT_SPLIT} GeV)"),
    )?;
    let eta = weighted_spanning(
        &etas,
        &weights,
        ANGLE_BINS,
        &format!("pt fraction vs eta (pt < {PT_SPLIT} GeV)"),
    )?;

    let eta_phi: Vec<(f64, f64)> = low.iter().map(|c| (c.eta, c.phi)).collect();
    let heat_map = create_weighted_eta_phi_density_map(
        &eta_phi,
        &weights,
        ETA_RANGE,
        HEAT_MAP_EDGES - 1,
        HEAT_MAP_EDGES - 1,
        DENSITY_CHARS,
    )?;

    Ok(PtFlow {
        low_pt,
        high_pt,
        phi,
        eta,
        heat_map,
    })
}

/// The pt-flow histograms and heat map of one event's particles.
pub fn render_pt_flow(particles: &[Particle]) -> viz::Result<String> {
    let flow = pt_flow(particles)?;
    let mut out = String::new();
    let hists = [
        Some(&flow.low_pt),
        Some(&flow.high_pt),
        flow.phi.as_ref(),
        flow.eta.as_ref(),
    ];
    for hist in hists.into_iter().flatten() {
        out.push_str(&hist.format()?);
        out.push('\n');
    }
    out.push_str(&flow.heat_map);
    Ok(out)
}

/// Mean and spread of `metric` against the pt cut, one column per run.
pub fn efficiency_vs_pt(runs: &[EfficiencyRun], metric: EfficiencyMetric) -> viz::Result<String> {
    runs.iter()
        .fold(
            ErrorBarPlot::new()
                .with_title(format!("{} vs pt cut", metric.title()))
                .with_x_label("pt [GeV]"),
            |plot, run| {
                let points = run
                    .cuts
                    .iter()
                    .map(|cut| {
                        let value = metric.of(cut);
                        (cut.pt_cut, value.mean, value.std)
                    })
                    .collect();
                plot.with_series(run.label.as_str(), points)
            },
        )
        .format()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Classification, QualityCuts};
    use crate::efficiency::CutEfficiency;
    use crate::event::{ModuleKey, TruthHit};
    use crate::stats::MeanStd;
    use crate::track::{Track, TrackHit};
    use approx::assert_relative_eq;

    fn particle(px: f64) -> Particle {
        directed(px, 0.0, 0.5)
    }

    fn directed(px: f64, py: f64, pz: f64) -> Particle {
        Particle {
            particle_id: 1,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            px,
            py,
            pz,
            q: 1,
            nhits: 0,
        }
    }

    fn table(pts: &[f64], lengths: &[f64]) -> FeatureTable {
        let mut table = FeatureTable::new();
        for (&pt, &len) in pts.iter().zip(lengths) {
            let hits = [0.0, len / 2.0, len]
                .iter()
                .enumerate()
                .map(|(i, &x)| TrackHit {
                    truth: TruthHit {
                        hit_id: i as u64,
                        particle_id: 1,
                        tx: 30.0 + x,
                        ty: 0.0,
                        tz: 0.0,
                        tpx: 1.0,
                        tpy: 0.0,
                        tpz: 0.0,
                        weight: 0.0,
                    },
                    module: ModuleKey {
                        volume_id: 8,
                        layer_id: 2 * (i as u32 + 1),
                        module_id: i as u32,
                    },
                })
                .collect();
            let track = Track {
                particle_id: 1,
                hits,
            };
            let Classification::Accepted(accepted) = classify(&track, &QualityCuts::default())
            else {
                panic!("fixture track rejected");
            };
            table.record(&accepted, &particle(pt));
        }
        table
    }

    #[test]
    fn test_histograms_use_fixed_edges() {
        let table = table(&[0.5, 7.0, 120.0], &[100.0, 150.0, 200.0]);
        let hists = feature_histograms(&table).unwrap();
        assert_eq!(hists.len(), 5);
        assert_eq!(hists[0].bin_edges(), &PT_EDGES);
        assert_eq!(hists[0].counts()[0], 1);
        assert_eq!(hists[0].counts()[3], 1);
        assert_eq!(hists[0].counts()[8], 1);
        // every track has three hits
        assert_eq!(hists[1].counts()[3], 3);
        assert_eq!(hists[4].counts().len(), LEN_BINS);
        assert_eq!(hists[4].total_count(), 3);
    }

    #[test]
    fn test_len_histogram_needs_spread() {
        let table = table(&[5.0, 6.0], &[100.0, 100.0]);
        assert_eq!(feature_histograms(&table).unwrap().len(), 4);
    }

    #[test]
    fn test_profiles() {
        let table = table(&[2.0, 4.0, 8.0], &[50.0, 100.0, 150.0]);
        let profiles = feature_profiles(&table).unwrap();
        assert_eq!(profiles.len(), PROFILED.len());
        let entries: u64 = profiles[0].bins().iter().map(|b| b.entries).sum();
        assert_eq!(entries, 3);
        assert!(feature_profiles(&FeatureTable::new()).unwrap().is_empty());
    }

    #[test]
    fn test_render_report() {
        let table = table(&[2.0, 4.0], &[50.0, 100.0]);
        let report = render_feature_report(&table).unwrap();
        assert!(report.contains("nHitsPerLayer"));
        assert!(report.contains("dPhi vs pt"));
    }

    #[test]
    fn test_pt_flow_splits_at_five_gev() {
        let particles = [
            particle(1.0),
            particle(3.0),
            particle(4.999),
            particle(5.0),
            particle(60.0),
            particle(200.0),
        ];
        let flow = pt_flow(&particles).unwrap();

        assert_eq!(flow.low_pt.bin_edges().len(), PT_FLOW_EDGES);
        assert_relative_eq!(flow.low_pt.bin_edges()[1], 5.0 / 49.0);
        assert_eq!(flow.low_pt.total_count(), 3);
        assert_eq!(flow.high_pt.bin_edges()[0], 5.0);
        assert_eq!(flow.high_pt.bin_edges()[49], PT_HIGH_MAX);
        assert_eq!(flow.high_pt.total_count(), 2);
        assert_eq!(flow.high_pt.overflow(), 1);
    }

    #[test]
    fn test_pt_flow_weights_low_pt_share() {
        // pt 1 at phi 0, pt 3 at phi pi/2, both at eta 0; the 50 GeV
        // particle carries no weight
        let particles = [
            directed(1.0, 0.0, 0.0),
            directed(0.0, 3.0, 0.0),
            directed(50.0, 0.0, 0.0),
        ];
        let flow = pt_flow(&particles).unwrap();

        let phi = flow.phi.unwrap();
        assert!(phi.is_weighted());
        assert_eq!(phi.counts().len(), ANGLE_BINS);
        assert_eq!(phi.total_count(), 2);
        assert_relative_eq!(phi.total_weight(), 1.0);
        assert_relative_eq!(phi.weights()[0], 0.25);
        assert_relative_eq!(phi.weights()[ANGLE_BINS - 1], 0.75);

        // both low-pt particles at eta 0 share one bin
        let eta = flow.eta.unwrap();
        assert_relative_eq!(eta.weights().iter().copied().fold(0.0, f64::max), 1.0);

        assert!(flow.heat_map.contains("Weighted density (eta vs phi)"));
        assert!(flow.heat_map.contains("(weight 0.7500)"));
        let rows = flow.heat_map.lines().filter(|l| l.starts_with("  |")).count();
        assert_eq!(rows, HEAT_MAP_EDGES - 1);
    }

    #[test]
    fn test_pt_flow_heat_map_drops_far_forward() {
        // eta ~ 6.9, outside the heat map but still in the eta histogram
        let particles = [directed(1.0, 0.0, 500.0), directed(1.0, 0.0, 0.0)];
        let flow = pt_flow(&particles).unwrap();
        assert!(flow.heat_map.contains("(weight 0.5000)"));
        assert_eq!(flow.eta.unwrap().total_count(), 2);
    }

    #[test]
    fn test_pt_flow_without_low_pt_particles() {
        let flow = pt_flow(&[particle(20.0)]).unwrap();
        assert!(flow.phi.is_none());
        assert!(flow.eta.is_none());
        assert_eq!(flow.high_pt.total_count(), 1);
        let text = render_pt_flow(&[particle(20.0)]).unwrap();
        assert!(text.contains("pt >= 5 GeV"));
        assert!(text.contains("(weight 0.0000)"));
    }

    fn cut(pt_cut: f64, seg: f64, truth: f64) -> CutEfficiency {
        let flat = |mean| MeanStd { mean, std: 0.01 };
        CutEfficiency {
            label: pt_cut.to_string(),
            pt_cut,
            n_graphs: 1,
            segment_efficiency: flat(seg),
            segment_efficiency_median: seg,
            truth_efficiency: flat(truth),
            n_nodes: flat(100.0),
            n_edges: flat(200.0),
            size_mb: flat(1.0),
        }
    }

    #[test]
    fn test_efficiency_vs_pt_side_by_side() {
        let runs = [
            EfficiencyRun {
                label: "LP".to_string(),
                cuts: vec![cut(0.5, 0.2, 0.9), cut(1.0, 0.4, 0.95)],
            },
            EfficiencyRun {
                label: "LP+".to_string(),
                cuts: vec![cut(1.0, 0.5, 0.97)],
            },
        ];
        let text = efficiency_vs_pt(&runs, EfficiencyMetric::Segment).unwrap();
        assert!(text.starts_with("Segment efficiency vs pt cut"));
        assert!(text.contains("LP+"));
        assert!(text.contains("0.400 +/- 0.010"));
        assert!(text.contains("0.500 +/- 0.010"));

        let text = efficiency_vs_pt(&runs, EfficiencyMetric::Truth).unwrap();
        assert!(text.contains("0.970 +/- 0.010"));
        assert!(efficiency_vs_pt(&[], EfficiencyMetric::Truth).is_err());
    }
}
