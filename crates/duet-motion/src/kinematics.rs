//! Kinematic steering model.
//!
//! Each call to [`MotionModel::step`] turns the agent toward its target by at
//! most `turn_rate · dt` radians and then moves it forward along the new
//! heading.  Forward speed is scaled down near the target (slowdown radius)
//! and by heading alignment (`max(cos(error), 0)`), so a badly misaligned
//! agent turns on the spot instead of orbiting.
//!
//! The model is stateless: the caller owns the [`Pose`] and passes it in.
//!
//! # Example
//!
//! ```rust
//! use duet_motion::kinematics::{MotionConfig, MotionModel};
//! use duet_spatial::world::World;
//! use duet_types::{Point2, Pose};
//!
//! let model = MotionModel::new(MotionConfig::default());
//! let world = World::new(600.0, 400.0);
//! let mut pose = Pose::new(100.0, 100.0, 0.0);
//! let target = Point2::new(300.0, 100.0);
//!
//! for _ in 0..600 {
//!     let out = model.step(&pose, Some(target), 1.0 / 60.0, &world);
//!     pose = out.pose;
//!     if out.arrived {
//!         break;
//!     }
//! }
//! assert!(pose.position().distance_to(target) <= 3.0);
//! ```

use duet_spatial::geometry::{angle_difference, bearing, clamp, wrap_to_pi};
use duet_spatial::world::World;
use duet_types::{Point2, Pose};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Whether the agent may translate while still turning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MotionPolicy {
    /// Move every tick; alignment only scales the speed.
    #[default]
    AlwaysMove,
    /// Rotate in place until `|heading error| < align_threshold` (radians).
    StopAndTurn { align_threshold: f64 },
}

fn default_speed() -> f64 {
    90.0
}

fn default_turn_rate() -> f64 {
    3.0
}

fn default_arrive_epsilon() -> f64 {
    3.0
}

fn default_slowdown_radius() -> f64 {
    40.0
}

fn default_min_speed_fraction() -> f64 {
    0.25
}

fn default_max_dt() -> f64 {
    0.25
}

/// Tuning for [`MotionModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MotionConfig {
    /// Cruise speed in world units per second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Maximum turn rate in radians per second.
    #[serde(default = "default_turn_rate")]
    pub turn_rate: f64,
    /// Distance at or below which the target counts as reached.
    #[serde(default = "default_arrive_epsilon")]
    pub arrive_epsilon: f64,
    /// Distance from the target at which the agent starts to slow down.
    #[serde(default = "default_slowdown_radius")]
    pub slowdown_radius: f64,
    /// Lower bound on the slowdown factor so the agent never stalls.
    #[serde(default = "default_min_speed_fraction")]
    pub min_speed_fraction: f64,
    #[serde(default)]
    pub policy: MotionPolicy,
    /// Longest time step honoured by a single tick (seconds).
    #[serde(default = "default_max_dt")]
    pub max_dt: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            turn_rate: default_turn_rate(),
            arrive_epsilon: default_arrive_epsilon(),
            slowdown_radius: default_slowdown_radius(),
            min_speed_fraction: default_min_speed_fraction(),
            policy: MotionPolicy::default(),
            max_dt: default_max_dt(),
        }
    }
}

impl MotionConfig {
    /// Builder-style override of the motion policy.
    pub fn with_policy(mut self, policy: MotionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Cap `dt` at `max_dt`.  Returns `None` for non-finite or non-positive
/// input, meaning the tick must be skipped.
pub fn sanitize_dt(dt: f64, max_dt: f64) -> Option<f64> {
    if !dt.is_finite() || dt <= 0.0 {
        return None;
    }
    if max_dt.is_finite() && max_dt > 0.0 {
        Some(dt.min(max_dt))
    } else {
        Some(dt)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Step
// ────────────────────────────────────────────────────────────────────────────

/// Result of one kinematic step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub pose: Pose,
    /// Distance to the target is within `arrive_epsilon` after the step.
    pub arrived: bool,
    /// Signed heading error remaining after the turn (radians).
    pub heading_error: f64,
    /// Position changed this step.
    pub moved: bool,
    /// The tentative position was inside an obstacle and was rejected.
    pub blocked: bool,
}

impl StepOutcome {
    fn stationary(pose: Pose, arrived: bool) -> Self {
        Self {
            pose,
            arrived,
            heading_error: 0.0,
            moved: false,
            blocked: false,
        }
    }
}

/// Stateless steering model parameterised by a [`MotionConfig`].
#[derive(Debug, Clone, Default)]
pub struct MotionModel {
    config: MotionConfig,
}

impl MotionModel {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Advance `pose` toward `target` by `dt` seconds inside `world`.
    ///
    /// With no target the pose is returned unchanged (heading normalised).
    pub fn step(&self, pose: &Pose, target: Option<Point2>, dt: f64, world: &World) -> StepOutcome {
        let heading = wrap_to_pi(pose.heading);
        let current = Pose::new(pose.x, pose.y, heading);

        let Some(dt) = sanitize_dt(dt, self.config.max_dt) else {
            return StepOutcome::stationary(current, false);
        };
        let Some(target) = target else {
            return StepOutcome::stationary(current, false);
        };

        let position = current.position();
        let distance = position.distance_to(target);
        let epsilon = self.config.arrive_epsilon.max(0.0);
        if distance <= epsilon {
            return StepOutcome::stationary(current, true);
        }

        // Turn.
        let desired = bearing(position, target);
        let max_turn = self.config.turn_rate.max(0.0) * dt;
        let turn = clamp(angle_difference(desired, heading), -max_turn, max_turn);
        let new_heading = wrap_to_pi(heading + turn);
        let error = angle_difference(desired, new_heading);

        let may_move = match self.config.policy {
            MotionPolicy::AlwaysMove => true,
            MotionPolicy::StopAndTurn { align_threshold } => error.abs() < align_threshold,
        };
        if !may_move {
            return StepOutcome {
                pose: Pose::new(pose.x, pose.y, new_heading),
                arrived: false,
                heading_error: error,
                moved: false,
                blocked: false,
            };
        }

        // Translate.
        let slowdown = if self.config.slowdown_radius > 0.0 && distance < self.config.slowdown_radius
        {
            (distance / self.config.slowdown_radius).max(self.config.min_speed_fraction)
        } else {
            1.0
        };
        let alignment = error.cos().max(0.0);
        let speed = self.config.speed.max(0.0) * slowdown * alignment;
        let travel = (speed * dt).min(distance);

        let tentative = world.clamp(Point2::new(
            position.x + travel * new_heading.cos(),
            position.y + travel * new_heading.sin(),
        ));

        if world.is_blocked(tentative) {
            trace!(x = tentative.x, y = tentative.y, "step rejected by obstacle");
            return StepOutcome {
                pose: Pose::new(pose.x, pose.y, new_heading),
                arrived: false,
                heading_error: error,
                moved: false,
                blocked: true,
            };
        }

        StepOutcome {
            pose: Pose::new(tentative.x, tentative.y, new_heading),
            arrived: tentative.distance_to(target) <= epsilon,
            heading_error: error,
            moved: tentative != position,
            blocked: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_spatial::world::Rect;
    use std::f64::consts::PI;

    const DT: f64 = 1.0 / 60.0;

    fn open_world() -> World {
        World::new(600.0, 400.0)
    }

    fn run_until_arrived(model: &MotionModel, mut pose: Pose, target: Point2) -> (Pose, StepOutcome, usize) {
        let world = open_world();
        for i in 0..5_000 {
            let out = model.step(&pose, Some(target), DT, &world);
            pose = out.pose;
            if out.arrived {
                return (pose, out, i);
            }
        }
        panic!("agent did not reach {target:?}; ended at {pose:?}");
    }

    #[test]
    fn converges_with_heading_aligned() {
        let model = MotionModel::default();
        // Start facing directly away from the target.
        let start = Pose::new(100.0, 100.0, PI);
        let target = Point2::new(400.0, 250.0);
        let (pose, last, _) = run_until_arrived(&model, start, target);

        assert!(pose.position().distance_to(target) <= model.config().arrive_epsilon);
        assert!(last.heading_error.abs() < 0.05, "error={}", last.heading_error);
        let final_bearing = bearing(start.position(), target);
        assert!(angle_difference(pose.heading, final_bearing).abs() < 0.2);
    }

    #[test]
    fn turn_is_rate_limited() {
        let model = MotionModel::default();
        let pose = Pose::new(100.0, 100.0, 0.0);
        let out = model.step(&pose, Some(Point2::new(100.0, 300.0)), 0.1, &open_world());
        // Desired +π/2; at 3 rad/s over 0.1 s the heading moves 0.3 rad.
        assert!((out.pose.heading - 0.3).abs() < 1e-9);
    }

    #[test]
    fn never_overshoots_target() {
        let model = MotionModel::new(MotionConfig {
            speed: 10_000.0,
            ..MotionConfig::default()
        });
        let pose = Pose::new(100.0, 100.0, 0.0);
        let target = Point2::new(110.0, 100.0);
        let out = model.step(&pose, Some(target), 0.2, &open_world());
        assert!(out.pose.x <= 110.0 + 1e-9);
        assert!(out.arrived);
    }

    #[test]
    fn within_epsilon_keeps_heading() {
        let model = MotionModel::default();
        let pose = Pose::new(100.0, 100.0, 1.234);
        let out = model.step(&pose, Some(Point2::new(101.0, 100.5)), DT, &open_world());
        assert!(out.arrived);
        assert!(!out.moved);
        assert_eq!(out.pose.heading, 1.234);
    }

    #[test]
    fn stop_and_turn_rotates_before_moving() {
        let model = MotionModel::new(
            MotionConfig::default().with_policy(MotionPolicy::StopAndTurn { align_threshold: 0.2 }),
        );
        let pose = Pose::new(100.0, 100.0, PI);
        let out = model.step(&pose, Some(Point2::new(300.0, 100.0)), DT, &open_world());
        assert!(!out.moved);
        assert_eq!(out.pose.position(), pose.position());
        assert_ne!(out.pose.heading, PI);

        let (pose, _, _) = run_until_arrived(&model, pose, Point2::new(300.0, 100.0));
        assert!(pose.position().distance_to(Point2::new(300.0, 100.0)) <= 3.0);
    }

    #[test]
    fn bad_dt_skips_step() {
        let model = MotionModel::default();
        let pose = Pose::new(100.0, 100.0, 0.0);
        let target = Some(Point2::new(300.0, 100.0));
        for dt in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let out = model.step(&pose, target, dt, &open_world());
            assert_eq!(out.pose, pose);
            assert!(!out.moved);
        }
    }

    #[test]
    fn large_dt_is_capped() {
        let model = MotionModel::default();
        let pose = Pose::new(100.0, 100.0, 0.0);
        let out = model.step(&pose, Some(Point2::new(500.0, 100.0)), 10.0, &open_world());
        // 90 units/s for at most 0.25 s.
        assert!((out.pose.x - 122.5).abs() < 1e-9);
        assert_eq!(sanitize_dt(10.0, 0.25), Some(0.25));
        assert_eq!(sanitize_dt(-1.0, 0.25), None);
    }

    #[test]
    fn obstacle_rejects_step_but_keeps_turn() {
        let world = World::new(600.0, 400.0)
            .with_obstacle(Rect::new(Point2::new(101.0, 90.0), Point2::new(140.0, 110.0)));
        let model = MotionModel::default();
        let pose = Pose::new(100.0, 100.0, 0.1);
        let out = model.step(&pose, Some(Point2::new(300.0, 100.0)), 0.1, &world);
        assert!(out.blocked);
        assert_eq!(out.pose.position(), pose.position());
        assert!(out.pose.heading.abs() < 0.1);
    }

    #[test]
    fn position_clamped_to_world() {
        let world = World::new(200.0, 200.0);
        let model = MotionModel::default();
        let mut pose = Pose::new(190.0, 100.0, 0.0);
        for _ in 0..120 {
            pose = model.step(&pose, Some(Point2::new(400.0, 100.0)), DT, &world).pose;
        }
        assert!(pose.x <= 200.0);
        assert!((pose.x - 200.0).abs() < 1e-9);
    }

    #[test]
    fn no_target_is_a_no_op() {
        let model = MotionModel::default();
        let pose = Pose::new(10.0, 10.0, 3.0 * PI);
        let out = model.step(&pose, None, DT, &open_world());
        assert_eq!(out.pose.position(), pose.position());
        assert!((out.pose.heading - PI).abs() < 1e-9);
        assert!(!out.arrived);
    }
}
