//! Geometry and math utilities.
//!
//! Stateless helpers used by the motion model, the belief filter and the
//! pathfinder.  Angles are radians throughout.
//!
//! # Example
//!
//! ```rust
//! use std::f64::consts::PI;
//! use duet_spatial::geometry::{angle_difference, wrap_to_pi};
//!
//! assert!((wrap_to_pi(3.0 * PI) - PI).abs() < 1e-9);
//! // Shortest signed turn from 170° to -170° is +20°, not -340°.
//! let d = angle_difference((-170.0f64).to_radians(), 170.0f64.to_radians());
//! assert!((d - 20.0f64.to_radians()).abs() < 1e-9);
//! ```

use std::f64::consts::{PI, TAU};

use duet_types::Point2;
use rand::Rng;

/// Reduce `angle` to the half-open interval (−π, π].
///
/// Terminates for every finite input: large magnitudes are first folded with
/// a Euclidean remainder so the adjustment loops run at most twice.  NaN and
/// ±∞ map to `0.0`.
pub fn wrap_to_pi(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle;
    if a.abs() > 2.0 * TAU {
        a = a.rem_euclid(TAU);
    }
    while a <= -PI {
        a += TAU;
    }
    while a > PI {
        a -= TAU;
    }
    a
}

/// Signed shortest angular distance from `b` to `a`, in (−π, π].
pub fn angle_difference(a: f64, b: f64) -> f64 {
    wrap_to_pi(a - b)
}

/// Clamp `v` to `[lo, hi]`.  Unlike [`f64::clamp`] this never panics when the
/// bounds are inverted; `lo` wins.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v > hi {
        hi.max(lo)
    } else if v < lo {
        lo
    } else {
        v
    }
}

/// Draw a standard-normal sample with the Box–Muller transform.
///
/// Uniform draws of exactly `0.0` are rejected and redrawn so `ln(0)` is never
/// evaluated.
pub fn gaussian_sample<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = loop {
        let u: f64 = rng.r#gen();
        if u > 0.0 {
            break u;
        }
    };
    let u2 = loop {
        let u: f64 = rng.r#gen();
        if u > 0.0 {
            break u;
        }
    };
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Straight-line distance between two points.
pub fn euclidean_distance(p: Point2, q: Point2) -> f64 {
    p.distance_to(q)
}

/// World-frame direction from `from` toward `to`.
///
/// Callers must make sure the points are distinct; `atan2(0, 0)` is defined
/// but meaningless as a heading.
pub fn bearing(from: Point2, to: Point2) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn wrap_keeps_in_range_values() {
        assert_eq!(wrap_to_pi(0.0), 0.0);
        assert!((wrap_to_pi(1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_to_pi(-1.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_pi_boundary_is_half_open() {
        assert!((wrap_to_pi(PI) - PI).abs() < 1e-12);
        // −π belongs to the excluded end and maps to +π.
        assert!((wrap_to_pi(-PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn wrap_guards_non_finite() {
        assert_eq!(wrap_to_pi(f64::NAN), 0.0);
        assert_eq!(wrap_to_pi(f64::INFINITY), 0.0);
        assert_eq!(wrap_to_pi(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn wrap_terminates_for_huge_inputs() {
        let w = wrap_to_pi(1.0e300);
        assert!(w > -PI && w <= PI);
        let w = wrap_to_pi(-7.5e18);
        assert!(w > -PI && w <= PI);
    }

    #[test]
    fn angle_difference_takes_short_way_round() {
        let a = 179.0f64.to_radians();
        let b = (-179.0f64).to_radians();
        assert!((angle_difference(a, b) - (-2.0f64).to_radians()).abs() < 1e-9);
        assert!((angle_difference(b, a) - 2.0f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn clamp_behaves_with_inverted_bounds() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
        assert_eq!(clamp(5.0, 2.0, 1.0), 2.0);
    }

    #[test]
    fn gaussian_sample_has_unit_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian_sample(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean={mean}");
        assert!((var - 1.0).abs() < 0.05, "var={var}");
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn bearing_cardinal_directions() {
        let o = Point2::new(0.0, 0.0);
        assert!(bearing(o, Point2::new(1.0, 0.0)).abs() < 1e-12);
        assert!((bearing(o, Point2::new(0.0, 1.0)) - PI / 2.0).abs() < 1e-12);
        assert!((bearing(o, Point2::new(-1.0, 0.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn euclidean_distance_is_symmetric() {
        let p = Point2::new(1.0, 2.0);
        let q = Point2::new(4.0, 6.0);
        assert!((euclidean_distance(p, q) - 5.0).abs() < 1e-12);
        assert_eq!(euclidean_distance(p, q), euclidean_distance(q, p));
    }

    proptest! {
        #[test]
        fn wrap_result_in_half_open_range(a in -1.0e6f64..1.0e6) {
            let w = wrap_to_pi(a);
            prop_assert!(w > -PI && w <= PI, "wrap({a}) = {w}");
        }

        #[test]
        fn wrap_is_two_pi_periodic(a in -100.0f64..100.0, k in -50i32..50) {
            let shifted = wrap_to_pi(a + TAU * f64::from(k));
            let base = wrap_to_pi(a);
            // Compare on the circle: ±π are the same direction.
            prop_assert!(angle_difference(shifted, base).abs() < 1e-9);
        }
    }
}
