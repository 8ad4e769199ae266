//! Sensing gate and distance-dependent noise model.
//!
//! A reading is only permitted when the agent is inside the sensing region
//! around the vantage point *and* the minimum inter-sense interval has
//! elapsed.  The interval timer is advanced by the same clamped delta-time
//! that drives the rest of the simulation, never by wall-clock time.

use duet_spatial::geometry::clamp;
use duet_types::Point2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// NoiseModel
// ────────────────────────────────────────────────────────────────────────────

/// Bearing noise grows linearly with distance from the vantage centre:
///
/// ```text
/// sigma = clamp(base + slope * (distance / sensing_radius), min_sigma, max_sigma)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoiseModel {
    pub base: f64,
    pub slope: f64,
    pub min_sigma: f64,
    pub max_sigma: f64,
}

/// Sigma never drops below this, whatever the configuration says.
const SIGMA_FLOOR: f64 = 1e-6;

impl NoiseModel {
    /// Bearing standard deviation (radians) at `distance` from the vantage
    /// centre of a region with radius `sensing_radius`.
    pub fn sigma_at(&self, distance: f64, sensing_radius: f64) -> f64 {
        let ratio = if sensing_radius > 0.0 {
            distance / sensing_radius
        } else {
            1.0
        };
        clamp(self.base + self.slope * ratio, self.min_sigma, self.max_sigma).max(SIGMA_FLOOR)
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            base: 0.05,
            slope: 0.10,
            min_sigma: 0.04,
            max_sigma: 0.20,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SensingGate
// ────────────────────────────────────────────────────────────────────────────

/// Spatial + temporal precondition for taking a reading.
#[derive(Debug, Clone)]
pub struct SensingGate {
    vantage: Point2,
    radius: f64,
    min_interval: f64,
    since_last: f64,
}

impl SensingGate {
    /// Create a gate around `vantage`.  The gate starts ready, so the first
    /// tick inside the region senses immediately.
    pub fn new(vantage: Point2, radius: f64, min_interval: f64) -> Self {
        let min_interval = min_interval.max(0.0);
        Self {
            vantage,
            radius: radius.max(0.0),
            min_interval,
            since_last: min_interval,
        }
    }

    pub fn vantage(&self) -> Point2 {
        self.vantage
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Accumulate simulated time since the last reading.
    pub fn advance(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.since_last += dt;
        }
    }

    /// Distance from `p` to the vantage centre.
    pub fn distance(&self, p: Point2) -> f64 {
        p.distance_to(self.vantage)
    }

    pub fn in_region(&self, p: Point2) -> bool {
        self.distance(p) <= self.radius
    }

    /// True when a reading may be taken at `p` right now.
    pub fn is_open(&self, p: Point2) -> bool {
        self.in_region(p) && self.since_last >= self.min_interval
    }

    /// Restart the interval timer after a reading.
    pub fn mark_sensed(&mut self) {
        self.since_last = 0.0;
    }

    /// Make the gate ready again (scenario reset).
    pub fn reset(&mut self) {
        self.since_last = self.min_interval;
    }
}
