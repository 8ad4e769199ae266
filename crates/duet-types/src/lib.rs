//! `duet-types` – shared vocabulary for the Duet simulation core.
//!
//! Every other crate in the workspace speaks in these types: positions and
//! poses, the two competing hypotheses, the operating modes a panel can be
//! switched into, the action labels surfaced to display consumers, and the
//! workspace-wide [`DuetError`].

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a node in a route graph (e.g. `"A"`, `"door"`).
pub type NodeId = String;

// ────────────────────────────────────────────────────────────────────────────
// Geometry primitives
// ────────────────────────────────────────────────────────────────────────────

/// A point in the 2-D world plane (world units, typically pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum.
    pub fn offset(self, by: Point2) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }

    /// Straight-line distance to `other`.
    pub fn distance_to(self, other: Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Agent pose: position plus heading in radians, counter-clockwise from +X.
///
/// The heading is kept in (−π, π] by the motion model; constructing a pose
/// with an out-of-range heading is allowed and is normalised on the first
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// The positional part of the pose.
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hypotheses and priors
// ────────────────────────────────────────────────────────────────────────────

/// One of the two competing location hypotheses tracked by the belief filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Hypothesis {
    First,
    Second,
}

impl Hypothesis {
    /// Both hypotheses in index order.
    pub const ALL: [Hypothesis; 2] = [Hypothesis::First, Hypothesis::Second];

    /// Index into a two-element belief or landmark array.
    pub fn index(self) -> usize {
        match self {
            Hypothesis::First => 0,
            Hypothesis::Second => 1,
        }
    }

    /// The competing hypothesis.
    pub fn other(self) -> Self {
        match self {
            Hypothesis::First => Hypothesis::Second,
            Hypothesis::Second => Hypothesis::First,
        }
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hypothesis::First => write!(f, "1"),
            Hypothesis::Second => write!(f, "2"),
        }
    }
}

/// Initial belief configuration applied on every scenario reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriorKind {
    /// `[0.5, 0.5]` – no preference.
    #[default]
    Uniform,
    /// Strongly favours hypothesis 1.
    FavorFirst,
    /// Strongly favours hypothesis 2.
    FavorSecond,
}

impl PriorKind {
    /// The hypothesis a strong prior commits to, or `None` for a uniform prior.
    pub fn favored(self) -> Option<Hypothesis> {
        match self {
            PriorKind::Uniform => None,
            PriorKind::FavorFirst => Some(Hypothesis::First),
            PriorKind::FavorSecond => Some(Hypothesis::Second),
        }
    }
}

impl std::str::FromStr for PriorKind {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" | "weak" => Ok(PriorKind::Uniform),
            "favor_first" | "first" | "1" => Ok(PriorKind::FavorFirst),
            "favor_second" | "second" | "2" => Ok(PriorKind::FavorSecond),
            other => Err(DuetError::Parse(format!("unknown prior '{other}'"))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Modes, goals and labels
// ────────────────────────────────────────────────────────────────────────────

/// How a simulation chooses its motion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Perception feeds action: sense at the vantage point until confident,
    /// then commit to the favoured landmark.
    #[default]
    Bidirectional,
    /// Action without perception: belief frozen at the prior.
    Stubborn,
    /// Follow a fixed, pre-learned route template toward the goal node.
    LearnedRoute,
    /// Follow an A*-planned path toward the goal node.
    PlannedPath,
}

impl Mode {
    /// `true` for the two graph-following modes.
    pub fn is_route_mode(self) -> bool {
        matches!(self, Mode::LearnedRoute | Mode::PlannedPath)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Bidirectional => "bidirectional",
            Mode::Stubborn => "stubborn",
            Mode::LearnedRoute => "learned_route",
            Mode::PlannedPath => "planned_path",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Mode {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bidirectional" | "bi" => Ok(Mode::Bidirectional),
            "stubborn" => Ok(Mode::Stubborn),
            "learned_route" | "learned" | "habit" => Ok(Mode::LearnedRoute),
            "planned_path" | "planned" | "map" => Ok(Mode::PlannedPath),
            other => Err(DuetError::Parse(format!("unknown mode '{other}'"))),
        }
    }
}

/// Navigation goal supplied by the host: either a graph node or a free point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Node(NodeId),
    Point(Point2),
}

/// Human-readable description of what the agent is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "action", content = "hypothesis")]
pub enum ActionLabel {
    /// Not moving with intent (paused, hold phase, no target yet).
    #[default]
    Idle,
    /// Heading to the vantage point to confirm before committing.
    Verifying,
    /// Belief is ambiguous; heading to the vantage point to sense.
    Localizing,
    /// Committed to the landmark of the given hypothesis.
    Committed(Hypothesis),
    /// Oscillating between landmarks without perception feedback.
    Dithering(Hypothesis),
    /// Following a learned route template.
    FollowingRoute,
    /// Following a planned path.
    FollowingPath,
    /// The route or goal point has been reached.
    Arrived,
    /// No route to the goal exists.
    NoRoute,
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionLabel::Idle => write!(f, "idle"),
            ActionLabel::Verifying => write!(f, "verifying before commit"),
            ActionLabel::Localizing => write!(f, "active localization"),
            ActionLabel::Committed(h) => write!(f, "commit to landmark {h}"),
            ActionLabel::Dithering(h) => write!(f, "dithering (toward landmark {h})"),
            ActionLabel::FollowingRoute => write!(f, "following learned route"),
            ActionLabel::FollowingPath => write!(f, "following planned path"),
            ActionLabel::Arrived => write!(f, "arrived"),
            ActionLabel::NoRoute => write!(f, "no route"),
        }
    }
}

/// Kind of movement a scripted demo phase represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Outbound,
    Return,
    Hold,
    ResetTransition,
}

impl MovementKind {
    /// Motion, sensing and policy only run during motion phases.
    pub fn is_motion(self) -> bool {
        matches!(self, MovementKind::Outbound | MovementKind::Return)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type for the fallible edges of the workspace (configuration loading,
/// command parsing, graph lookups).  Nothing inside a simulation tick returns
/// this; tick-time conditions are recovered locally.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DuetError {
    #[error("Unknown graph node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypothesis_index_and_other() {
        assert_eq!(Hypothesis::First.index(), 0);
        assert_eq!(Hypothesis::Second.index(), 1);
        assert_eq!(Hypothesis::First.other(), Hypothesis::Second);
        assert_eq!(Hypothesis::Second.other().other(), Hypothesis::Second);
    }

    #[test]
    fn prior_favored_hypothesis() {
        assert_eq!(PriorKind::Uniform.favored(), None);
        assert_eq!(PriorKind::FavorFirst.favored(), Some(Hypothesis::First));
        assert_eq!(PriorKind::FavorSecond.favored(), Some(Hypothesis::Second));
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("planned".parse::<Mode>().unwrap(), Mode::PlannedPath);
        assert_eq!("Stubborn".parse::<Mode>().unwrap(), Mode::Stubborn);
        assert!("teleport".parse::<Mode>().is_err());
        assert!(Mode::LearnedRoute.is_route_mode());
        assert!(!Mode::Bidirectional.is_route_mode());
    }

    #[test]
    fn prior_parses_aliases() {
        assert_eq!("2".parse::<PriorKind>().unwrap(), PriorKind::FavorSecond);
        assert_eq!("weak".parse::<PriorKind>().unwrap(), PriorKind::Uniform);
        let err = "maybe".parse::<PriorKind>().unwrap_err();
        assert!(err.to_string().contains("unknown prior"));
    }

    #[test]
    fn action_label_display() {
        assert_eq!(
            ActionLabel::Committed(Hypothesis::First).to_string(),
            "commit to landmark 1"
        );
        assert_eq!(ActionLabel::Localizing.to_string(), "active localization");
    }

    #[test]
    fn action_label_json_roundtrip() {
        let label = ActionLabel::Dithering(Hypothesis::Second);
        let json = serde_json::to_string(&label).unwrap();
        let back: ActionLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(label, back);
    }

    #[test]
    fn goal_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            goal: Goal,
        }
        let w: Wrapper = toml::from_str("goal = { node = \"I\" }").unwrap();
        assert_eq!(w.goal, Goal::Node("I".to_string()));
        let w: Wrapper = toml::from_str("goal = { point = { x = 1.0, y = 2.0 } }").unwrap();
        assert_eq!(w.goal, Goal::Point(Point2::new(1.0, 2.0)));
    }

    #[test]
    fn movement_kind_motion_phases() {
        assert!(MovementKind::Outbound.is_motion());
        assert!(MovementKind::Return.is_motion());
        assert!(!MovementKind::Hold.is_motion());
        assert!(!MovementKind::ResetTransition.is_motion());
    }

    #[test]
    fn point_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-12);
        assert_eq!(a.offset(b), b);
    }

    #[test]
    fn duet_error_display() {
        let err = DuetError::UnknownNode("Z".to_string());
        assert!(err.to_string().contains("Z"));
        let err = DuetError::InvalidConfig("empty demo script".to_string());
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
