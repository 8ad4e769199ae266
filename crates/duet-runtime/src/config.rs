//! Scenario configuration.
//!
//! A [`ScenarioConfig`] is everything one simulation instance needs: the
//! world, the route graph, the two landmarks and the beacon, belief/motion/
//! policy tuning, the initial pose and operating mode, and an optional demo
//! script.  Every field has a default, so a scenario file only needs to
//! spell out what differs.
//!
//! Scenario files are TOML:
//!
//! ```toml
//! name = "corridor"
//! mode = "planned_path"
//! goal = { node = "C" }
//! start = { x = 0.0, y = 0.0, heading = 0.0 }
//!
//! [graph.A]
//! x = 0.0
//! y = 0.0
//! neighbors = ["B"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use duet_motion::kinematics::MotionConfig;
use duet_motion::route::DEFAULT_WAYPOINT_TOLERANCE;
use duet_perception::belief::BeliefConfig;
use duet_policy::policy::PolicyConfig;
use duet_spatial::graph::Graph;
use duet_spatial::world::World;
use duet_types::{DuetError, Goal, Mode, NodeId, Point2, Pose, PriorKind};
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sequencer::{PhaseDescriptor, Sequencer};

// ────────────────────────────────────────────────────────────────────────────
// Defaults
// ────────────────────────────────────────────────────────────────────────────

fn default_name() -> String {
    "custom".to_string()
}

fn default_landmarks() -> [Point2; 2] {
    [Point2::new(150.0, 360.0), Point2::new(450.0, 360.0)]
}

fn default_beacon() -> Point2 {
    Point2::new(560.0, 170.0)
}

fn default_vantage() -> Point2 {
    Point2::new(300.0, 170.0)
}

fn default_start() -> Pose {
    Pose::new(300.0, 40.0, std::f64::consts::FRAC_PI_2)
}

fn default_prior_strength() -> f64 {
    0.9
}

fn default_trail_capacity() -> usize {
    240
}

fn default_waypoint_tolerance() -> f64 {
    DEFAULT_WAYPOINT_TOLERANCE
}

// ────────────────────────────────────────────────────────────────────────────
// ScenarioConfig
// ────────────────────────────────────────────────────────────────────────────

/// Full parameter set for one [`Simulation`][crate::Simulation].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub world: World,
    #[serde(default)]
    pub graph: Graph,
    /// Landmark each hypothesis commits to, indexed by hypothesis.
    #[serde(default = "default_landmarks")]
    pub landmarks: [Point2; 2],
    /// Fixed point whose bearing is measured.
    #[serde(default = "default_beacon")]
    pub beacon: Point2,
    /// Centre of the sensing region.
    #[serde(default = "default_vantage")]
    pub vantage: Point2,
    #[serde(default)]
    pub belief: BeliefConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default = "default_start")]
    pub start: Pose,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub prior: PriorKind,
    /// Weight a strong prior puts on its favoured hypothesis.
    #[serde(default = "default_prior_strength")]
    pub prior_strength: f64,
    /// Random seed; omitted means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Fixed route templates keyed by goal node.
    #[serde(default)]
    pub learned_routes: BTreeMap<NodeId, Vec<NodeId>>,
    #[serde(default)]
    pub goal: Option<Goal>,
    /// Number of recent positions kept in the trail.
    #[serde(default = "default_trail_capacity")]
    pub trail_capacity: usize,
    /// Radius within which a route waypoint counts as reached.
    #[serde(default = "default_waypoint_tolerance")]
    pub waypoint_tolerance: f64,
    /// Optional looping demo script.
    #[serde(default)]
    pub demo: Option<Vec<PhaseDescriptor>>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            world: World::default(),
            graph: Graph::default(),
            landmarks: default_landmarks(),
            beacon: default_beacon(),
            vantage: default_vantage(),
            belief: BeliefConfig::default(),
            motion: MotionConfig::default(),
            policy: PolicyConfig::default(),
            start: default_start(),
            mode: Mode::default(),
            prior: PriorKind::default(),
            prior_strength: default_prior_strength(),
            seed: None,
            learned_routes: BTreeMap::new(),
            goal: None,
            trail_capacity: default_trail_capacity(),
            waypoint_tolerance: default_waypoint_tolerance(),
            demo: None,
        }
    }
}

impl ScenarioConfig {
    /// Parse and validate a TOML scenario.
    pub fn from_toml_str(s: &str) -> Result<Self, DuetError> {
        let config: Self = toml::from_str(s).map_err(|e| DuetError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, DuetError> {
        toml::to_string_pretty(self).map_err(|e| DuetError::Parse(e.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_prior(mut self, prior: PriorKind) -> Self {
        self.prior = prior;
        self
    }

    /// Reject configurations a simulation cannot run with.
    pub fn validate(&self) -> Result<(), DuetError> {
        let bounds = self.world.bounds;
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(DuetError::InvalidConfig(
                "world bounds must have positive width and height".to_string(),
            ));
        }
        let alpha = self.belief.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(DuetError::InvalidConfig(format!(
                "belief.alpha must be in (0, 1], got {alpha}"
            )));
        }
        let threshold = self.belief.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DuetError::InvalidConfig(format!(
                "belief.confidence_threshold must be in [0, 1], got {threshold}"
            )));
        }
        if !(self.prior_strength.is_finite() && (0.5..=1.0).contains(&self.prior_strength)) {
            return Err(DuetError::InvalidConfig(format!(
                "prior_strength must be in [0.5, 1], got {}",
                self.prior_strength
            )));
        }
        if let Some(Goal::Node(id)) = &self.goal
            && !self.graph.contains(id)
        {
            return Err(DuetError::UnknownNode(id.clone()));
        }
        if let Some(phases) = &self.demo {
            Sequencer::new(phases.clone())?;
            for phase in phases {
                if let Some(Goal::Node(id)) = &phase.goal
                    && !self.graph.contains(id)
                {
                    return Err(DuetError::UnknownNode(id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Non-fatal oddities worth reporting to the user.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (goal, route) in &self.learned_routes {
            if !self.graph.contains(goal) {
                out.push(format!("learned route key '{goal}' is not a graph node"));
            }
            for id in route.iter().filter(|id| !self.graph.contains(id)) {
                out.push(format!("learned route to '{goal}' references unknown node '{id}'"));
            }
        }
        for (i, landmark) in self.landmarks.iter().enumerate() {
            if !self.world.bounds.contains(*landmark) {
                out.push(format!("landmark {} lies outside the world", i + 1));
            }
        }
        if self.world.is_blocked(self.start.position()) {
            out.push("start pose is inside an obstacle".to_string());
        }
        out
    }
}

/// Read, parse and validate a TOML scenario file.  Warnings are logged.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<ScenarioConfig, DuetError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| DuetError::Io(format!("{}: {e}", path.display())))?;
    let config = ScenarioConfig::from_toml_str(&text)?;
    for warning in config.warnings() {
        warn!(scenario = %config.name, "{warning}");
    }
    info!(scenario = %config.name, path = %path.display(), "scenario loaded");
    Ok(config)
}

/// JSON schema describing a scenario file.
pub fn scenario_schema() -> RootSchema {
    schemars::schema_for!(ScenarioConfig)
}
