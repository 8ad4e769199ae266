//! [`ActionPolicy`] – explore-vs-commit mode controller.
//!
//! Every tick the policy maps the current belief, operating mode and prior to
//! a motion target plus an [`ActionLabel`].  Rules are evaluated in order and
//! the first match wins:
//!
//! | Mode            | Condition                          | Target          | Label            |
//! |-----------------|------------------------------------|-----------------|------------------|
//! | bidirectional   | verify latch set                   | vantage point   | `Verifying`      |
//! | bidirectional   | belief confident                   | favoured mark   | `Committed(h)`   |
//! | bidirectional   | belief ambiguous                   | vantage point   | `Localizing`     |
//! | stubborn        | strong prior                       | prior's mark    | `Committed(h)`   |
//! | stubborn        | uniform prior                      | alternating     | `Dithering(h)`   |
//! | learned/planned | waypoint pending                   | waypoint        | `Following*`     |
//! | learned/planned | route finished                     | none            | `Arrived`        |
//! | learned/planned | no route                           | none            | `NoRoute`        |
//!
//! The verify latch is armed on [`ActionPolicy::reset`] when
//! `verify_before_commit` is configured, and clears only once a sensing
//! update has happened and the resulting belief is confident.
//!
//! # Example
//!
//! ```rust
//! use duet_perception::belief::Belief;
//! use duet_policy::policy::{ActionPolicy, PolicyConfig, PolicyInputs, RouteStatus};
//! use duet_types::{ActionLabel, Hypothesis, Mode, Point2, PriorKind};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut policy = ActionPolicy::new(PolicyConfig::default());
//! let mut rng = StdRng::seed_from_u64(7);
//! let inputs = PolicyInputs {
//!     mode: Mode::Stubborn,
//!     prior: PriorKind::FavorSecond,
//!     belief: Belief::from_prior(PriorKind::FavorSecond, 0.9),
//!     confidence_threshold: 0.4,
//!     sensed: false,
//!     landmarks: [Point2::new(150.0, 360.0), Point2::new(450.0, 360.0)],
//!     vantage: Point2::new(300.0, 170.0),
//!     route: RouteStatus::Missing,
//! };
//!
//! let decision = policy.decide(&inputs, 1.0 / 60.0, &mut rng);
//! assert_eq!(decision.label, ActionLabel::Committed(Hypothesis::Second));
//! assert_eq!(decision.target, Some(Point2::new(450.0, 360.0)));
//! ```

use duet_perception::belief::Belief;
use duet_types::{ActionLabel, Hypothesis, Mode, Point2, PriorKind};
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lower bound on the dither period; the flip loop needs a positive step.
const MIN_DITHER_PERIOD: f64 = 1e-3;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

fn default_dither_period() -> f64 {
    1.6
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyConfig {
    /// Seconds spent heading to one landmark before a stubborn agent with a
    /// uniform prior switches to the other.
    #[serde(default = "default_dither_period")]
    pub dither_period: f64,
    /// In bidirectional mode, always visit the vantage point and sense before
    /// committing, even when the prior already looks confident.
    #[serde(default)]
    pub verify_before_commit: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            dither_period: default_dither_period(),
            verify_before_commit: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs and outputs
// ────────────────────────────────────────────────────────────────────────────

/// Progress of the route follower, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteStatus {
    /// A waypoint is pending.
    Following(Point2),
    /// The last waypoint has been reached.
    Finished,
    /// No route exists for the current goal.
    Missing,
}

/// Everything the policy reads on one tick.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
    pub mode: Mode,
    pub prior: PriorKind,
    pub belief: Belief,
    pub confidence_threshold: f64,
    /// A belief update was applied this tick.
    pub sensed: bool,
    pub landmarks: [Point2; 2],
    pub vantage: Point2,
    pub route: RouteStatus,
}

/// The policy's choice for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub target: Option<Point2>,
    pub label: ActionLabel,
}

/// Internal state of the mode controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PolicyState {
    Verifying,
    Localizing,
    Committed { hypothesis: Hypothesis },
    Dithering { side: Hypothesis, remaining: f64 },
    Routing,
}

// ────────────────────────────────────────────────────────────────────────────
// ActionPolicy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ActionPolicy {
    config: PolicyConfig,
    state: Option<PolicyState>,
    verify_latch: bool,
}

impl ActionPolicy {
    /// Create a policy.  The verify latch starts armed when
    /// `verify_before_commit` is set.
    pub fn new(config: PolicyConfig) -> Self {
        let verify_latch = config.verify_before_commit;
        Self {
            config,
            state: None,
            verify_latch,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// State chosen on the most recent [`decide`][Self::decide], if any.
    pub fn state(&self) -> Option<PolicyState> {
        self.state
    }

    pub fn is_verify_latched(&self) -> bool {
        self.verify_latch
    }

    /// Forget the current state and re-arm the verify latch.
    pub fn reset(&mut self) {
        self.state = None;
        self.verify_latch = self.config.verify_before_commit;
    }

    /// Pick a target and label for this tick.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        inputs: &PolicyInputs,
        dt: f64,
        rng: &mut R,
    ) -> Decision {
        // Unusable time steps count as no time passing.
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let (state, decision) = match inputs.mode {
            Mode::Bidirectional => self.bidirectional(inputs),
            Mode::Stubborn => self.stubborn(inputs, dt, rng),
            Mode::LearnedRoute | Mode::PlannedPath => Self::routing(inputs),
        };
        if self.state.as_ref().map(std::mem::discriminant) != Some(std::mem::discriminant(&state)) {
            debug!(?state, label = %decision.label, "policy state changed");
        }
        self.state = Some(state);
        decision
    }

    fn bidirectional(&mut self, inputs: &PolicyInputs) -> (PolicyState, Decision) {
        let confident = inputs.belief.is_confident(inputs.confidence_threshold);

        if self.verify_latch {
            if inputs.sensed && confident {
                self.verify_latch = false;
                debug!("verification complete");
            } else {
                return (
                    PolicyState::Verifying,
                    Decision {
                        target: Some(inputs.vantage),
                        label: ActionLabel::Verifying,
                    },
                );
            }
        }

        if confident {
            let hypothesis = inputs.belief.favored();
            (
                PolicyState::Committed { hypothesis },
                Decision {
                    target: Some(inputs.landmarks[hypothesis.index()]),
                    label: ActionLabel::Committed(hypothesis),
                },
            )
        } else {
            (
                PolicyState::Localizing,
                Decision {
                    target: Some(inputs.vantage),
                    label: ActionLabel::Localizing,
                },
            )
        }
    }

    fn stubborn<R: Rng + ?Sized>(
        &mut self,
        inputs: &PolicyInputs,
        dt: f64,
        rng: &mut R,
    ) -> (PolicyState, Decision) {
        if let Some(hypothesis) = inputs.prior.favored() {
            return (
                PolicyState::Committed { hypothesis },
                Decision {
                    target: Some(inputs.landmarks[hypothesis.index()]),
                    label: ActionLabel::Committed(hypothesis),
                },
            );
        }

        let period = self.config.dither_period.max(MIN_DITHER_PERIOD);
        let (side, remaining) = match self.state {
            Some(PolicyState::Dithering { side, remaining }) => {
                let left = remaining - dt;
                if left > 0.0 {
                    (side, left)
                } else {
                    // One flip per whole period elapsed, however large dt is.
                    let flips = (-left / period).floor() + 1.0;
                    let side = if flips % 2.0 == 1.0 { side.other() } else { side };
                    let rest = left.rem_euclid(period);
                    (side, if rest > 0.0 { rest } else { period })
                }
            }
            _ => {
                let side = if rng.gen_bool(0.5) {
                    Hypothesis::First
                } else {
                    Hypothesis::Second
                };
                (side, period)
            }
        };

        (
            PolicyState::Dithering { side, remaining },
            Decision {
                target: Some(inputs.landmarks[side.index()]),
                label: ActionLabel::Dithering(side),
            },
        )
    }

    fn routing(inputs: &PolicyInputs) -> (PolicyState, Decision) {
        let following = if inputs.mode == Mode::LearnedRoute {
            ActionLabel::FollowingRoute
        } else {
            ActionLabel::FollowingPath
        };
        let decision = match inputs.route {
            RouteStatus::Following(waypoint) => Decision {
                target: Some(waypoint),
                label: following,
            },
            RouteStatus::Finished => Decision {
                target: None,
                label: ActionLabel::Arrived,
            },
            RouteStatus::Missing => Decision {
                target: None,
                label: ActionLabel::NoRoute,
            },
        };
        (PolicyState::Routing, decision)
    }
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}
