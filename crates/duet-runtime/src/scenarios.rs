//! Built-in scenario presets.
//!
//! | Name                   | What it shows                                             |
//! |------------------------|-----------------------------------------------------------|
//! | `bidirectional`        | Wrong strong prior corrected by sensing en route          |
//! | `bidirectional_verify` | Same, but the agent always checks at the vantage point    |
//! | `stubborn`             | Same wrong prior, no sensing: heads to the wrong landmark |
//! | `spatial_constructs`   | Planned A* path vs. fixed learned route on a ring graph   |
//! | `bidirectional_demo`   | Looping script: bidirectional run, then stubborn run      |
//! | `spatial_demo`         | Looping script: outbound and return along planned paths   |

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use duet_perception::belief::BeliefConfig;
use duet_policy::policy::PolicyConfig;
use duet_spatial::graph::Graph;
use duet_spatial::world::{Rect, World};
use duet_types::{DuetError, Goal, Mode, MovementKind, Point2, Pose, PriorKind};

use crate::config::ScenarioConfig;
use crate::sequencer::PhaseDescriptor;

/// Every preset name accepted by [`preset`].
pub const PRESETS: &[&str] = &[
    "bidirectional",
    "bidirectional_verify",
    "stubborn",
    "spatial_constructs",
    "bidirectional_demo",
    "spatial_demo",
];

/// Look up a preset by name.
pub fn preset(name: &str) -> Result<ScenarioConfig, DuetError> {
    match name {
        "bidirectional" => Ok(bidirectional()),
        "bidirectional_verify" => Ok(bidirectional_verify()),
        "stubborn" => Ok(stubborn()),
        "spatial_constructs" => Ok(spatial_constructs()),
        "bidirectional_demo" => Ok(bidirectional_demo()),
        "spatial_demo" => Ok(spatial_demo()),
        other => Err(DuetError::InvalidConfig(format!(
            "unknown scenario '{other}' (expected one of: {})",
            PRESETS.join(", ")
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Perception ↔ action panel
// ────────────────────────────────────────────────────────────────────────────

fn two_landmark_world() -> World {
    World::new(600.0, 400.0)
        .with_obstacle(Rect::new(Point2::new(30.0, 80.0), Point2::new(110.0, 220.0)))
        .with_obstacle(Rect::new(Point2::new(490.0, 240.0), Point2::new(570.0, 320.0)))
}

/// Strong prior on the wrong landmark (2); the direct path to it passes
/// close enough to the vantage point for sensing to correct the belief.
pub fn bidirectional() -> ScenarioConfig {
    ScenarioConfig {
        name: "bidirectional".to_string(),
        world: two_landmark_world(),
        landmarks: [Point2::new(150.0, 360.0), Point2::new(450.0, 360.0)],
        beacon: Point2::new(560.0, 170.0),
        vantage: Point2::new(300.0, 170.0),
        belief: BeliefConfig {
            sensing_radius: 100.0,
            hypothesis_offsets: [Point2::new(0.0, 0.0), Point2::new(0.0, 150.0)],
            ..BeliefConfig::default()
        },
        start: Pose::new(300.0, 40.0, FRAC_PI_2),
        mode: Mode::Bidirectional,
        prior: PriorKind::FavorSecond,
        ..ScenarioConfig::default()
    }
}

pub fn bidirectional_verify() -> ScenarioConfig {
    ScenarioConfig {
        name: "bidirectional_verify".to_string(),
        policy: PolicyConfig {
            verify_before_commit: true,
            ..PolicyConfig::default()
        },
        ..bidirectional()
    }
}

pub fn stubborn() -> ScenarioConfig {
    ScenarioConfig {
        name: "stubborn".to_string(),
        mode: Mode::Stubborn,
        ..bidirectional()
    }
}

pub fn bidirectional_demo() -> ScenarioConfig {
    ScenarioConfig {
        name: "bidirectional_demo".to_string(),
        demo: Some(vec![
            PhaseDescriptor::new("reset", 1.0, MovementKind::ResetTransition)
                .resetting()
                .with_mode(Mode::Bidirectional),
            PhaseDescriptor::new("bidirectional_outbound", 12.0, MovementKind::Outbound),
            PhaseDescriptor::new("bidirectional_hold", 2.0, MovementKind::Hold),
            PhaseDescriptor::new("reset_stubborn", 1.0, MovementKind::ResetTransition)
                .resetting()
                .with_mode(Mode::Stubborn),
            PhaseDescriptor::new("stubborn_outbound", 10.0, MovementKind::Outbound),
            PhaseDescriptor::new("stubborn_hold", 2.0, MovementKind::Hold),
        ]),
        ..bidirectional()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Spatial constructs panel
// ────────────────────────────────────────────────────────────────────────────

/// Eight nodes on a ring around a central obstacle.
pub fn ring_graph() -> Graph {
    Graph::new()
        .with_node("A", 100.0, 80.0)
        .with_node("B", 300.0, 80.0)
        .with_node("C", 500.0, 80.0)
        .with_node("D", 80.0, 200.0)
        .with_node("F", 500.0, 200.0)
        .with_node("G", 100.0, 320.0)
        .with_node("H", 300.0, 320.0)
        .with_node("I", 500.0, 320.0)
        .with_edge("A", "B")
        .with_edge("B", "C")
        .with_edge("C", "F")
        .with_edge("F", "I")
        .with_edge("I", "H")
        .with_edge("H", "G")
        .with_edge("G", "D")
        .with_edge("D", "A")
}

fn learned_routes() -> BTreeMap<String, Vec<String>> {
    let route = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    BTreeMap::from([
        ("I".to_string(), route(&["A", "B", "C", "F", "I"])),
        ("A".to_string(), route(&["I", "F", "C", "B", "A"])),
    ])
}

/// Planned path vs. learned route from A to I.  Removing the C–F edge makes
/// the planner detour through D, G and H while the learned route does not
/// change.
pub fn spatial_constructs() -> ScenarioConfig {
    ScenarioConfig {
        name: "spatial_constructs".to_string(),
        world: World::new(600.0, 400.0)
            .with_obstacle(Rect::new(Point2::new(180.0, 130.0), Point2::new(420.0, 270.0))),
        graph: ring_graph(),
        learned_routes: learned_routes(),
        start: Pose::new(100.0, 80.0, 0.0),
        mode: Mode::PlannedPath,
        goal: Some(Goal::Node("I".to_string())),
        ..ScenarioConfig::default()
    }
}

pub fn spatial_demo() -> ScenarioConfig {
    ScenarioConfig {
        name: "spatial_demo".to_string(),
        demo: Some(vec![
            PhaseDescriptor::new("reset", 1.0, MovementKind::ResetTransition)
                .resetting()
                .with_mode(Mode::PlannedPath)
                .with_goal(Goal::Node("I".to_string())),
            PhaseDescriptor::new("outbound", 10.0, MovementKind::Outbound),
            PhaseDescriptor::new("hold_far", 1.5, MovementKind::Hold),
            PhaseDescriptor::new("return", 10.0, MovementKind::Return)
                .with_goal(Goal::Node("A".to_string())),
            PhaseDescriptor::new("hold_home", 1.5, MovementKind::Hold),
        ]),
        ..spatial_constructs()
    }
}
