//! Momentum-derived detector coordinates.
//!
//! TrackML momenta are in GeV with the beam along z. Azimuthal angles are
//! reported in `[0, 2π)` measured from the x axis.

use std::f64::consts::{PI, TAU};

/// A three-momentum (GeV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Momentum {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl Momentum {
    pub fn new(px: f64, py: f64, pz: f64) -> Self {
        Self { px, py, pz }
    }

    /// Total momentum |p|.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Momentum transverse to the beam axis.
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Pseudorapidity, `atanh(pz / p)`.
    ///
    /// Infinite for momenta along the beam and NaN for a zero momentum,
    /// matching what numpy produces for the same inputs.
    pub fn eta(&self) -> f64 {
        (self.pz / self.p()).atanh()
    }

    /// Azimuthal angle in `[0, 2π)`.
    pub fn phi(&self) -> f64 {
        normalize_phi(self.py.atan2(self.px))
    }

    pub fn coords(&self) -> DetectorCoords {
        DetectorCoords {
            p: self.p(),
            pt: self.pt(),
            eta: self.eta(),
            phi: self.phi(),
        }
    }
}

/// Derived scalars of a momentum vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorCoords {
    pub p: f64,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
}

/// Map an `atan2` result from `[-π, π]` to `[0, 2π)`.
///
/// Tiny negative angles can round to exactly 2π after the shift; those wrap
/// to 0 so the result never reaches the upper bound.
pub fn normalize_phi(phi: f64) -> f64 {
    let shifted = if phi < 0.0 { phi + TAU } else { phi };
    if shifted >= TAU {
        shifted - TAU
    } else {
        shifted
    }
}

/// Shortest arc between two azimuthal angles, in `[0, π]`.
pub fn delta_phi(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().rem_euclid(TAU);
    let arc = diff.min(TAU - diff);
    arc.clamp(0.0, PI)
}

/// Distance of a point from the origin.
pub fn radius3(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transverse_and_total_momentum() {
        let m = Momentum::new(3.0, 4.0, 12.0);
        assert_relative_eq!(m.pt(), 5.0);
        assert_relative_eq!(m.p(), 13.0);
    }

    #[test]
    fn test_eta_zero_at_right_angle() {
        let m = Momentum::new(1.0, 1.0, 0.0);
        assert_relative_eq!(m.eta(), 0.0);
        let forward = Momentum::new(1.0, 0.0, 1.0);
        assert!(forward.eta() > 0.0);
        let backward = Momentum::new(1.0, 0.0, -1.0);
        assert_relative_eq!(backward.eta(), -forward.eta());
    }

    #[test]
    fn test_phi_range() {
        assert_relative_eq!(Momentum::new(1.0, 0.0, 0.0).phi(), 0.0);
        assert_relative_eq!(Momentum::new(0.0, 1.0, 0.0).phi(), PI / 2.0);
        assert_relative_eq!(Momentum::new(0.0, -1.0, 0.0).phi(), 1.5 * PI);
        assert_relative_eq!(Momentum::new(-1.0, 0.0, 0.0).phi(), PI);
    }

    #[test]
    fn test_normalize_phi_never_returns_two_pi() {
        assert_eq!(normalize_phi(-1e-20), 0.0);
        assert!(normalize_phi(-1e-9) < TAU);
        assert_relative_eq!(normalize_phi(-PI / 2.0), 1.5 * PI);
    }

    #[test]
    fn test_delta_phi_takes_short_way_round() {
        assert_relative_eq!(delta_phi(0.1, TAU - 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(1.0, 2.5), 1.5, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(0.0, PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_phi_bounded_on_grid() {
        let steps = 64;
        for i in 0..steps {
            for j in 0..steps {
                let a = TAU * i as f64 / steps as f64;
                let b = TAU * j as f64 / steps as f64;
                let d = delta_phi(a, b);
                assert!((0.0..=PI).contains(&d), "dphi({a}, {b}) = {d}");
            }
        }
    }
}
