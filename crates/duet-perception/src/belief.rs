//! Two-hypothesis recursive belief filter.
//!
//! The agent is unsure which of two places it is in.  Hypothesis `h` claims
//! the agent's true position is shifted by `hypothesis_offsets[h]`; each
//! hypothesis therefore predicts a different bearing to a fixed beacon.  A
//! noisy bearing reading is compared against both predictions and the belief
//! is updated with a tempered Gaussian likelihood:
//!
//! ```text
//! err_h        = |angle_difference(measured, predicted_h)|
//! likelihood_h = exp(-0.5 * (err_h / sigma)^2)
//! w_h         *= likelihood_h ^ alpha          (alpha ∈ (0, 1])
//! w           /= Σ w                           (skipped if Σ w < 1e-9)
//! ```
//!
//! # Example
//!
//! ```rust
//! use duet_perception::belief::{Belief, BeliefConfig, BeliefFilter};
//! use duet_types::{Point2, Pose, PriorKind};
//!
//! let config = BeliefConfig::default();
//! let prior = Belief::from_prior(PriorKind::Uniform, 0.9);
//! let mut filter = BeliefFilter::new(config, Point2::new(0.0, 0.0), prior);
//!
//! // Noise-free reading taken from the true pose favours hypothesis 1,
//! // whose offset is zero.
//! let pose = Pose::new(0.0, 0.0, 0.0);
//! let beacon = Point2::new(200.0, 0.0);
//! let m = filter.observe(&pose, beacon, 0.0, 0.1).clone();
//! assert!(m.applied);
//! assert!(filter.belief().weights()[0] > 0.5);
//! ```

use duet_spatial::geometry::{angle_difference, bearing, gaussian_sample, wrap_to_pi};
use duet_types::{Hypothesis, Point2, Pose, PriorKind};
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::gate::{NoiseModel, SensingGate};

/// Pre-normalisation mass below which an update is discarded.
const DEGENERATE_SUM: f64 = 1e-9;

/// Slack allowed when comparing a belief margin with its threshold.
pub const CONFIDENCE_EPSILON: f64 = 1e-9;

// ────────────────────────────────────────────────────────────────────────────
// Belief
// ────────────────────────────────────────────────────────────────────────────

/// Normalised probability vector `[w1, w2]` over the two hypotheses.
///
/// Invariant: both weights are finite, non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Belief([f64; 2]);

impl Belief {
    pub fn uniform() -> Self {
        Self([0.5, 0.5])
    }

    /// Belief for a configured prior.  `strength` is the weight a strong prior
    /// places on its favoured hypothesis, clamped to `[0.5, 1.0]`.
    pub fn from_prior(kind: PriorKind, strength: f64) -> Self {
        let s = if strength.is_finite() {
            strength.clamp(0.5, 1.0)
        } else {
            0.5
        };
        match kind {
            PriorKind::Uniform => Self::uniform(),
            PriorKind::FavorFirst => Self([s, 1.0 - s]),
            PriorKind::FavorSecond => Self([1.0 - s, s]),
        }
    }

    /// Normalise arbitrary non-negative weights.  Invalid input (negative,
    /// non-finite, or summing to ~0) yields the uniform belief.
    pub fn from_weights(w1: f64, w2: f64) -> Self {
        let valid = w1.is_finite() && w2.is_finite() && w1 >= 0.0 && w2 >= 0.0;
        let sum = w1 + w2;
        if !valid || sum < DEGENERATE_SUM {
            return Self::uniform();
        }
        Self([w1 / sum, w2 / sum])
    }

    pub fn weights(&self) -> [f64; 2] {
        self.0
    }

    pub fn weight(&self, h: Hypothesis) -> f64 {
        self.0[h.index()]
    }

    /// The hypothesis with the larger weight; ties go to hypothesis 1.
    pub fn favored(&self) -> Hypothesis {
        if self.0[1] > self.0[0] {
            Hypothesis::Second
        } else {
            Hypothesis::First
        }
    }

    /// `|w1 − w2|`.
    pub fn margin(&self) -> f64 {
        (self.0[0] - self.0[1]).abs()
    }

    /// `|w1 − w2| >= threshold`.  The boundary counts as confident, within
    /// [`CONFIDENCE_EPSILON`] of rounding error.
    pub fn is_confident(&self, threshold: f64) -> bool {
        self.margin() + CONFIDENCE_EPSILON >= threshold
    }

    /// Multiply in tempered likelihoods and renormalise.  Returns `false` and
    /// leaves the belief untouched when the result would be degenerate.
    fn apply(&mut self, likelihoods: [f64; 2], alpha: f64) -> bool {
        let w1 = self.0[0] * likelihoods[0].powf(alpha);
        let w2 = self.0[1] * likelihoods[1].powf(alpha);
        let sum = w1 + w2;
        if !sum.is_finite() || sum < DEGENERATE_SUM {
            return false;
        }
        self.0 = [w1 / sum, w2 / sum];
        true
    }
}

impl Default for Belief {
    fn default() -> Self {
        Self::uniform()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Measurement record
// ────────────────────────────────────────────────────────────────────────────

/// Everything about one sense event that a display layer may want to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Measurement {
    /// Noisy egocentric bearing to the beacon (radians).
    pub measured_bearing: f64,
    /// Noise standard deviation used for this reading (radians).
    pub sigma: f64,
    /// Bearing each hypothesis predicted.
    pub predicted: [f64; 2],
    /// Absolute angular error per hypothesis.
    pub errors: [f64; 2],
    /// Hypothesis with the smaller error for this reading (ties → 1).
    pub winner: Hypothesis,
    /// `false` when the update was skipped as numerically degenerate.
    pub applied: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Tuning for [`BeliefFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BeliefConfig {
    /// Tempering exponent applied to every likelihood, in (0, 1].
    pub alpha: f64,
    /// Margin `|w1 − w2|` at or above which the belief counts as resolved.
    pub confidence_threshold: f64,
    /// Radius of the sensing region around the vantage point.
    pub sensing_radius: f64,
    /// Minimum simulated seconds between readings.
    pub min_sense_interval: f64,
    pub noise: NoiseModel,
    /// Position shift each hypothesis applies to the agent's true position.
    pub hypothesis_offsets: [Point2; 2],
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            confidence_threshold: 0.40,
            sensing_radius: 100.0,
            min_sense_interval: 0.35,
            noise: NoiseModel::default(),
            hypothesis_offsets: [Point2::new(0.0, 0.0), Point2::new(0.0, 150.0)],
        }
    }
}

impl BeliefConfig {
    fn alpha(&self) -> f64 {
        if self.alpha.is_finite() {
            self.alpha.clamp(f64::EPSILON, 1.0)
        } else {
            1.0
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// BeliefFilter
// ────────────────────────────────────────────────────────────────────────────

/// Sequential Bayesian filter over the two hypotheses, gated by a
/// [`SensingGate`].
///
/// In stubborn mode sensing never happens and the belief stays at its prior
/// for the whole run.
#[derive(Debug, Clone)]
pub struct BeliefFilter {
    config: BeliefConfig,
    gate: SensingGate,
    belief: Belief,
    last: Option<Measurement>,
    stubborn: bool,
}

impl BeliefFilter {
    pub fn new(config: BeliefConfig, vantage: Point2, prior: Belief) -> Self {
        let gate = SensingGate::new(vantage, config.sensing_radius, config.min_sense_interval);
        Self {
            config,
            gate,
            belief: prior,
            last: None,
            stubborn: false,
        }
    }

    pub fn belief(&self) -> Belief {
        self.belief
    }

    /// Latest measurement, or `None` when no reading was taken recently.
    pub fn measurement(&self) -> Option<&Measurement> {
        self.last.as_ref()
    }

    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    pub fn gate(&self) -> &SensingGate {
        &self.gate
    }

    pub fn is_confident(&self) -> bool {
        self.belief.is_confident(self.config.confidence_threshold)
    }

    pub fn is_stubborn(&self) -> bool {
        self.stubborn
    }

    /// Enable or disable the stubborn (no sensing) operating mode.
    pub fn set_stubborn(&mut self, stubborn: bool) {
        self.stubborn = stubborn;
        if stubborn {
            self.last = None;
        }
    }

    /// Restore `prior`, forget the last reading and re-arm the gate.
    pub fn reset(&mut self, prior: Belief) {
        self.belief = prior;
        self.last = None;
        self.gate.reset();
    }

    pub fn clear_measurement(&mut self) {
        self.last = None;
    }

    /// Advance the inter-sense timer.
    pub fn advance(&mut self, dt: f64) {
        self.gate.advance(dt);
    }

    /// Take a reading if the gate allows it and update the belief.
    ///
    /// Returns the new measurement record, or `None` when no reading was
    /// taken.  Leaving the sensing region clears the previous record; inside
    /// the region it is kept until the next reading replaces it.
    pub fn sense<R: Rng + ?Sized>(
        &mut self,
        pose: &Pose,
        beacon: Point2,
        rng: &mut R,
    ) -> Option<&Measurement> {
        if self.stubborn {
            self.last = None;
            return None;
        }
        let position = pose.position();
        if !self.gate.in_region(position) {
            self.last = None;
            return None;
        }
        if !self.gate.is_open(position) {
            return None;
        }

        let sigma = self
            .config
            .noise
            .sigma_at(self.gate.distance(position), self.gate.radius());
        let truth = egocentric_bearing(position, pose.heading, beacon);
        let measured = wrap_to_pi(truth + gaussian_sample(rng) * sigma);

        self.gate.mark_sensed();
        Some(self.observe(pose, beacon, measured, sigma))
    }

    /// Apply one bearing reading, bypassing the gate.
    ///
    /// This is the deterministic core of [`sense`][Self::sense]; call it
    /// directly to feed a known reading.
    pub fn observe(
        &mut self,
        pose: &Pose,
        beacon: Point2,
        measured: f64,
        sigma: f64,
    ) -> &Measurement {
        let sigma = if sigma.is_finite() && sigma > 0.0 {
            sigma
        } else {
            1e-6
        };
        let position = pose.position();

        let mut predicted = [0.0; 2];
        let mut errors = [0.0; 2];
        let mut likelihoods = [0.0; 2];
        for h in Hypothesis::ALL {
            let i = h.index();
            let shifted = position.offset(self.config.hypothesis_offsets[i]);
            predicted[i] = egocentric_bearing(shifted, pose.heading, beacon);
            errors[i] = angle_difference(measured, predicted[i]).abs();
            likelihoods[i] = (-0.5 * (errors[i] / sigma).powi(2)).exp();
        }

        let winner = if errors[1] < errors[0] {
            Hypothesis::Second
        } else {
            Hypothesis::First
        };

        let applied = self.belief.apply(likelihoods, self.config.alpha());
        if applied {
            trace!(
                w1 = self.belief.weights()[0],
                w2 = self.belief.weights()[1],
                sigma,
                %winner,
                "belief updated"
            );
        } else {
            debug!(?errors, sigma, "degenerate likelihood sum; belief left unchanged");
        }

        self.last.insert(Measurement {
            measured_bearing: measured,
            sigma,
            predicted,
            errors,
            winner,
            applied,
        })
    }
}

/// Bearing to `target` relative to `heading`, in (−π, π].
fn egocentric_bearing(from: Point2, heading: f64, target: Point2) -> f64 {
    if from.distance_to(target) < 1e-9 {
        return 0.0;
    }
    wrap_to_pi(bearing(from, target) - heading)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BEACON: Point2 = Point2::new(560.0, 170.0);
    const VANTAGE: Point2 = Point2::new(300.0, 170.0);

    fn filter(prior: Belief) -> BeliefFilter {
        BeliefFilter::new(BeliefConfig::default(), VANTAGE, prior)
    }

    fn sum(b: Belief) -> f64 {
        b.weights().iter().sum()
    }

    #[test]
    fn confidence_threshold_boundaries() {
        assert!(!Belief::from_weights(0.69, 0.31).is_confident(0.40));
        assert!(Belief::from_weights(0.71, 0.29).is_confident(0.40));
        // Exactly at the threshold counts as confident (>=), even though
        // 0.70 - 0.30 rounds to just below 0.40.
        assert!(Belief::from_weights(0.70, 0.30).is_confident(0.40));
        assert!(Belief::from_weights(0.30, 0.70).is_confident(0.40));
        assert!(Belief::from_weights(0.75, 0.25).is_confident(0.50));
        assert!(Belief::from_weights(0.25, 0.75).is_confident(0.50));
    }

    #[test]
    fn prior_kinds_map_to_vectors() {
        assert_eq!(Belief::from_prior(PriorKind::Uniform, 0.9).weights(), [0.5, 0.5]);
        let b = Belief::from_prior(PriorKind::FavorSecond, 0.9).weights();
        assert!((b[0] - 0.1).abs() < 1e-12 && (b[1] - 0.9).abs() < 1e-12);
        // Strength is clamped into [0.5, 1].
        assert_eq!(Belief::from_prior(PriorKind::FavorFirst, 3.0).weights(), [1.0, 0.0]);
    }

    #[test]
    fn favored_ties_go_to_first() {
        assert_eq!(Belief::uniform().favored(), Hypothesis::First);
        assert_eq!(Belief::from_weights(0.2, 0.8).favored(), Hypothesis::Second);
    }

    #[test]
    fn from_weights_rejects_garbage() {
        assert_eq!(Belief::from_weights(-1.0, 2.0), Belief::uniform());
        assert_eq!(Belief::from_weights(f64::NAN, 1.0), Belief::uniform());
        assert_eq!(Belief::from_weights(0.0, 0.0), Belief::uniform());
    }

    #[test]
    fn update_stays_normalised() {
        let mut f = filter(Belief::from_prior(PriorKind::FavorSecond, 0.9));
        let mut rng = StdRng::seed_from_u64(3);
        let pose = Pose::new(300.0, 170.0, 1.0);
        for _ in 0..50 {
            let measured = rng.r#gen::<f64>() * 2.0 - 1.0;
            let m = f.observe(&pose, BEACON, measured, 0.1).clone();
            let b = f.belief().weights();
            if m.applied {
                assert!((sum(f.belief()) - 1.0).abs() < 1e-6);
            }
            assert!(b[0] >= 0.0 && b[1] >= 0.0);
        }
    }

    #[test]
    fn confirming_evidence_is_monotone() {
        let mut f = filter(Belief::from_prior(PriorKind::FavorSecond, 0.9));
        let pose = Pose::new(300.0, 170.0, 0.0);
        let truth = egocentric_bearing(pose.position(), pose.heading, BEACON);
        let mut previous = f.belief().weight(Hypothesis::First);
        // Small perturbations around the truth; hypothesis 2 predicts ~-30°.
        for k in 0..10 {
            let measured = truth + 0.01 * (k as f64 - 5.0);
            let m = f.observe(&pose, BEACON, measured, 0.2).clone();
            assert!(m.errors[0] < m.errors[1]);
            assert_eq!(m.winner, Hypothesis::First);
            let w1 = f.belief().weight(Hypothesis::First);
            assert!(w1 >= previous, "w1 decreased: {previous} -> {w1}");
            previous = w1;
        }
        assert!(f.belief().weight(Hypothesis::First) > 0.5);
    }

    #[test]
    fn degenerate_update_leaves_belief_unchanged() {
        let prior = Belief::from_prior(PriorKind::FavorFirst, 0.9);
        let mut f = filter(prior);
        let pose = Pose::new(300.0, 170.0, 0.0);
        // A reading pointing straight backwards with a tiny sigma: both
        // likelihoods underflow to zero.
        let m = f.observe(&pose, BEACON, std::f64::consts::PI, 1e-4).clone();
        assert!(!m.applied);
        assert_eq!(f.belief(), prior);
    }

    #[test]
    fn sense_outside_gate_clears_record() {
        let mut f = filter(Belief::uniform());
        let mut rng = StdRng::seed_from_u64(11);
        let at_vantage = Pose::new(300.0, 170.0, 0.0);
        assert!(f.sense(&at_vantage, BEACON, &mut rng).is_some());
        assert!(f.measurement().is_some());

        let far_away = Pose::new(20.0, 20.0, 0.0);
        f.advance(1.0);
        assert!(f.sense(&far_away, BEACON, &mut rng).is_none());
        assert!(f.measurement().is_none());
    }

    #[test]
    fn sense_respects_min_interval() {
        let mut f = filter(Belief::uniform());
        let mut rng = StdRng::seed_from_u64(5);
        let pose = Pose::new(310.0, 170.0, 0.0);
        assert!(f.sense(&pose, BEACON, &mut rng).is_some());
        f.advance(0.1);
        assert!(f.sense(&pose, BEACON, &mut rng).is_none());
        // Too soon, but still in the region: the last record stays visible.
        assert!(f.measurement().is_some());
        f.advance(0.3);
        assert!(f.sense(&pose, BEACON, &mut rng).is_some());
    }

    #[test]
    fn stubborn_filter_never_senses() {
        let prior = Belief::from_prior(PriorKind::FavorSecond, 0.9);
        let mut f = filter(prior);
        f.set_stubborn(true);
        let mut rng = StdRng::seed_from_u64(1);
        let pose = Pose::new(300.0, 170.0, 0.0);
        for _ in 0..20 {
            f.advance(0.5);
            assert!(f.sense(&pose, BEACON, &mut rng).is_none());
        }
        assert_eq!(f.belief(), prior);
        assert!(f.measurement().is_none());
    }

    #[test]
    fn repeated_sensing_at_vantage_resolves_truth() {
        let mut f = filter(Belief::from_prior(PriorKind::FavorSecond, 0.9));
        let mut rng = StdRng::seed_from_u64(99);
        let pose = Pose::new(300.0, 170.0, 0.3);
        for _ in 0..10 {
            f.advance(0.4);
            f.sense(&pose, BEACON, &mut rng);
        }
        assert!(f.is_confident());
        assert_eq!(f.belief().favored(), Hypothesis::First);
    }

    #[test]
    fn reset_restores_prior_and_clears_record() {
        let prior = Belief::uniform();
        let mut f = filter(prior);
        let pose = Pose::new(300.0, 170.0, 0.0);
        f.observe(&pose, BEACON, 0.0, 0.1);
        assert_ne!(f.belief(), prior);
        f.reset(prior);
        assert_eq!(f.belief(), prior);
        assert!(f.measurement().is_none());
    }
}
