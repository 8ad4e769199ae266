//! [`Simulation`] – one panel's worth of simulation state.
//!
//! The host calls [`Simulation::tick`] once per animation frame and reads the
//! public accessors afterwards.  Each tick:
//!
//! 1. **Clamp** – the delta-time is capped at `motion.max_dt`; non-finite or
//!    non-positive values skip the tick entirely.
//! 2. **Sequence** – a demo script (if any) advances and every phase entered
//!    is applied (reset, trail fade, mode, goal).
//! 3. **Gate** – hold and reset phases stop here: no sensing, no policy, no
//!    motion.
//! 4. **Sense** – in the bidirectional and stubborn modes the belief filter
//!    is offered a bearing reading (the stubborn filter refuses it).
//! 5. **Route** – the route cursor advances past reached waypoints.
//! 6. **Decide** – the action policy picks a target and a label; label
//!    changes are queued for [`Simulation::drain_transitions`].
//! 7. **Move** – the kinematic model steps the pose and the trail grows.
//!
//! Nothing in a tick can fail; unreachable goals, degenerate belief updates
//! and bad time steps are all recovered locally and logged.

use std::collections::VecDeque;

use duet_motion::kinematics::{MotionModel, sanitize_dt};
use duet_motion::route::RouteFollower;
use duet_perception::belief::{Belief, BeliefFilter, Measurement};
use duet_policy::policy::{ActionPolicy, PolicyInputs, RouteStatus};
use duet_policy::transition::{LabelTransition, TransitionLog};
use duet_spatial::graph::{Graph, find_route};
use duet_spatial::world::World;
use duet_types::{ActionLabel, DuetError, Goal, Mode, NodeId, Point2, Pose, PriorKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScenarioConfig;
use crate::sequencer::{PhaseDescriptor, Sequencer};

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

/// Serialisable copy of everything a display layer reads.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub scenario: String,
    pub elapsed: f64,
    pub running: bool,
    pub mode: Mode,
    pub prior: PriorKind,
    pub pose: Pose,
    pub belief: [f64; 2],
    pub confident: bool,
    pub measurement: Option<Measurement>,
    pub label: ActionLabel,
    pub label_text: String,
    pub target: Option<Point2>,
    pub goal: Option<Goal>,
    pub route: Option<Vec<NodeId>>,
    pub route_cursor: Option<usize>,
    pub phase: Option<String>,
    pub phase_fraction: Option<f64>,
    pub trail: Vec<Point2>,
}

// ────────────────────────────────────────────────────────────────────────────
// Simulation
// ────────────────────────────────────────────────────────────────────────────

pub struct Simulation {
    id: Uuid,
    config: ScenarioConfig,
    graph: Graph,
    motion: MotionModel,
    filter: BeliefFilter,
    policy: ActionPolicy,
    transitions: TransitionLog,
    sequencer: Option<Sequencer>,
    rng: StdRng,

    pose: Pose,
    mode: Mode,
    prior: PriorKind,
    goal: Option<Goal>,
    route: Option<RouteFollower>,
    target: Option<Point2>,
    label: ActionLabel,
    trail: VecDeque<Point2>,
    running: bool,
    elapsed: f64,
}

impl Simulation {
    /// Build a simulation from a validated configuration.
    ///
    /// The random source is seeded from `config.seed` when present and from
    /// OS entropy otherwise.  A demo script starts at phase 0 with that
    /// phase's entry actions already applied.
    pub fn new(config: ScenarioConfig) -> Result<Self, DuetError> {
        config.validate()?;

        let sequencer = config.demo.clone().map(Sequencer::new).transpose()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let prior_belief = Belief::from_prior(config.prior, config.prior_strength);

        let mut sim = Self {
            id: Uuid::new_v4(),
            graph: config.graph.clone(),
            motion: MotionModel::new(config.motion.clone()),
            filter: BeliefFilter::new(config.belief.clone(), config.vantage, prior_belief),
            policy: ActionPolicy::new(config.policy.clone()),
            transitions: TransitionLog::new(),
            sequencer,
            rng,
            pose: config.start,
            mode: config.mode,
            prior: config.prior,
            goal: config.goal.clone(),
            route: None,
            target: None,
            label: ActionLabel::Idle,
            trail: VecDeque::with_capacity(config.trail_capacity),
            running: true,
            elapsed: 0.0,
            config,
        };

        info!(
            sim = %sim.id,
            scenario = %sim.config.name,
            mode = %sim.mode,
            seed = ?sim.config.seed,
            "simulation created"
        );
        sim.reinitialize();
        sim.enter_first_phase();
        Ok(sim)
    }

    // ── Tick ────────────────────────────────────────────────────────────────

    /// Advance the simulation by `dt` seconds of simulated time.
    pub fn tick(&mut self, dt: f64) {
        if !self.running {
            return;
        }
        let Some(dt) = sanitize_dt(dt, self.motion.config().max_dt) else {
            debug!(sim = %self.id, dt, "skipping tick with unusable dt");
            return;
        };
        self.elapsed += dt;

        for phase in self.advance_sequencer(dt) {
            self.enter_phase(&phase);
        }

        if !self.phase_permits_motion() {
            self.target = None;
            self.set_label(ActionLabel::Idle);
            return;
        }

        // Sense.
        self.filter.advance(dt);
        let sensed = match self.mode {
            Mode::Bidirectional | Mode::Stubborn => self
                .filter
                .sense(&self.pose, self.config.beacon, &mut self.rng)
                .is_some_and(|m| m.applied),
            Mode::LearnedRoute | Mode::PlannedPath => {
                self.filter.clear_measurement();
                false
            }
        };

        // Route.
        let position = self.pose.position();
        if let Some(route) = self.route.as_mut() {
            route.advance_if_reached(position);
        }

        // Decide.
        let inputs = PolicyInputs {
            mode: self.mode,
            prior: self.prior,
            belief: self.filter.belief(),
            confidence_threshold: self.filter.config().confidence_threshold,
            sensed,
            landmarks: self.config.landmarks,
            vantage: self.config.vantage,
            route: self.route_status(),
        };
        let decision = self.policy.decide(&inputs, dt, &mut self.rng);
        self.target = decision.target;
        self.set_label(decision.label);

        // Move.
        let outcome = self
            .motion
            .step(&self.pose, self.target, dt, &self.config.world);
        self.pose = outcome.pose;
        if outcome.moved {
            self.push_trail(self.pose.position());
        }
    }

    // ── Mutators ────────────────────────────────────────────────────────────

    /// Switch operating mode.  The policy state is cleared and the route is
    /// replanned; pose and belief are kept.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            info!(sim = %self.id, from = %self.mode, to = %mode, "mode changed");
        }
        self.apply_mode(mode);
    }

    /// Change the prior.  This reinitialises the run so the new prior takes
    /// effect from the start pose.
    pub fn set_prior(&mut self, prior: PriorKind) {
        info!(sim = %self.id, ?prior, "prior changed");
        self.prior = prior;
        self.reinitialize();
    }

    /// Set the navigation goal and replan.
    ///
    /// A node goal must exist in the current graph.  When no route to it can
    /// be found the previous route is kept and a warning is logged.
    pub fn set_goal(&mut self, goal: Goal) -> Result<(), DuetError> {
        if let Goal::Node(id) = &goal
            && !self.graph.contains(id)
        {
            return Err(DuetError::UnknownNode(id.clone()));
        }
        info!(sim = %self.id, ?goal, "goal changed");
        self.goal = Some(goal);
        self.replan();
        Ok(())
    }

    /// Replace the route graph and replan the current goal.
    pub fn set_graph(&mut self, graph: Graph) {
        info!(sim = %self.id, nodes = graph.len(), "graph replaced");
        self.graph = graph;
        self.replan();
    }

    /// Back to the initial state: start pose, prior belief, empty trail, and
    /// the demo script (if any) at phase 0.
    pub fn reset(&mut self) {
        info!(sim = %self.id, "simulation reset");
        self.mode = self.config.mode;
        self.goal = self.config.goal.clone();
        self.reinitialize();
        if let Some(seq) = self.sequencer.as_mut() {
            seq.restart();
        }
        self.enter_first_phase();
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn world(&self) -> &World {
        &self.config.world
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn belief(&self) -> Belief {
        self.filter.belief()
    }

    pub fn is_confident(&self) -> bool {
        self.filter.is_confident()
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        self.filter.measurement()
    }

    pub fn label(&self) -> ActionLabel {
        self.label
    }

    pub fn target(&self) -> Option<Point2> {
        self.target
    }

    pub fn goal(&self) -> Option<&Goal> {
        self.goal.as_ref()
    }

    pub fn route(&self) -> Option<&[NodeId]> {
        self.route.as_ref().map(RouteFollower::route)
    }

    pub fn route_cursor(&self) -> Option<usize> {
        self.route.as_ref().map(RouteFollower::cursor)
    }

    pub fn phase(&self) -> Option<&PhaseDescriptor> {
        self.sequencer.as_ref().map(Sequencer::current)
    }

    pub fn phase_fraction(&self) -> Option<f64> {
        self.sequencer.as_ref().map(Sequencer::fraction)
    }

    /// Recent positions, oldest first.
    pub fn trail(&self) -> impl Iterator<Item = &Point2> {
        self.trail.iter()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn prior(&self) -> PriorKind {
        self.prior
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Simulated seconds since the last reset.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Label transitions since the last call, oldest first.
    pub fn drain_transitions(&mut self) -> Vec<LabelTransition> {
        self.transitions.drain()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id,
            scenario: self.config.name.clone(),
            elapsed: self.elapsed,
            running: self.running,
            mode: self.mode,
            prior: self.prior,
            pose: self.pose,
            belief: self.belief().weights(),
            confident: self.is_confident(),
            measurement: self.measurement().cloned(),
            label: self.label,
            label_text: self.label.to_string(),
            target: self.target,
            goal: self.goal.clone(),
            route: self.route().map(<[NodeId]>::to_vec),
            route_cursor: self.route_cursor(),
            phase: self.phase().map(|p| p.id.clone()),
            phase_fraction: self.phase_fraction(),
            trail: self.trail.iter().copied().collect(),
        }
    }

    // ── Internals ───────────────────────────────────────────────────────────

    /// Restore pose, belief, policy, trail and route for the current mode,
    /// prior and goal.
    fn reinitialize(&mut self) {
        self.pose = self.config.start;
        self.elapsed = 0.0;
        self.filter
            .reset(Belief::from_prior(self.prior, self.config.prior_strength));
        self.filter.set_stubborn(self.mode == Mode::Stubborn);
        self.policy.reset();
        self.trail.clear();
        self.route = None;
        self.target = None;
        self.set_label(ActionLabel::Idle);
        self.replan();
    }

    fn apply_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.filter.set_stubborn(mode == Mode::Stubborn);
        self.policy.reset();
        self.replan();
    }

    fn advance_sequencer(&mut self, dt: f64) -> Vec<PhaseDescriptor> {
        let Some(seq) = self.sequencer.as_mut() else {
            return Vec::new();
        };
        let entered = seq.advance(dt);
        entered
            .into_iter()
            .filter_map(|i| seq.phase(i).cloned())
            .collect()
    }

    fn enter_first_phase(&mut self) {
        if let Some(phase) = self.sequencer.as_ref().map(|s| s.current().clone()) {
            self.enter_phase(&phase);
        }
    }

    fn enter_phase(&mut self, phase: &PhaseDescriptor) {
        info!(sim = %self.id, phase = %phase.id, movement = ?phase.movement, "phase entered");
        if phase.reset_on_enter {
            self.reinitialize();
        }
        if phase.fade_trails {
            self.trail.clear();
        }
        if let Some(goal) = &phase.goal {
            self.goal = Some(goal.clone());
        }
        match phase.mode {
            Some(mode) => self.apply_mode(mode),
            None if phase.goal.is_some() => self.replan(),
            None => {}
        }
    }

    fn phase_permits_motion(&self) -> bool {
        self.sequencer
            .as_ref()
            .is_none_or(|s| s.current().movement.is_motion())
    }

    /// Rebuild the route for the current mode and goal.
    fn replan(&mut self) {
        if !self.mode.is_route_mode() {
            self.route = None;
            return;
        }
        let Some(Goal::Node(goal)) = self.goal.clone() else {
            self.route = None;
            return;
        };

        let planned = match self.mode {
            Mode::LearnedRoute => match self.config.learned_routes.get(&goal) {
                Some(template) => Some(template.clone()),
                None => {
                    warn!(sim = %self.id, %goal, "no learned route to goal");
                    self.route = None;
                    return;
                }
            },
            _ => self
                .graph
                .nearest_node(self.pose.position())
                .cloned()
                .and_then(|start| find_route(&self.graph, &start, &goal)),
        };

        let Some(route) = planned else {
            warn!(
                sim = %self.id,
                %goal,
                kept = self.route.is_some(),
                "goal unreachable; keeping previous route"
            );
            return;
        };

        match RouteFollower::new(route, &self.graph) {
            Ok(follower) => {
                debug!(sim = %self.id, route = ?follower.route(), "route planned");
                self.route = Some(follower.with_tolerance(self.config.waypoint_tolerance));
            }
            Err(e) => {
                warn!(sim = %self.id, %goal, error = %e, "route references unknown node");
                self.route = None;
            }
        }
    }

    fn route_status(&self) -> RouteStatus {
        match &self.goal {
            Some(Goal::Point(p)) => {
                if self.pose.position().distance_to(*p) <= self.motion.config().arrive_epsilon {
                    RouteStatus::Finished
                } else {
                    RouteStatus::Following(*p)
                }
            }
            Some(Goal::Node(_)) => match &self.route {
                Some(route) => match route.current_waypoint() {
                    Some(waypoint) => RouteStatus::Following(waypoint),
                    None => RouteStatus::Finished,
                },
                None => RouteStatus::Missing,
            },
            None => RouteStatus::Missing,
        }
    }

    fn set_label(&mut self, label: ActionLabel) {
        if let Some(t) = self.transitions.observe(label, self.elapsed) {
            info!(sim = %self.id, from = %t.from, to = %t.to, at = t.at, "action changed");
        }
        self.label = label;
    }

    fn push_trail(&mut self, p: Point2) {
        if self.config.trail_capacity == 0 {
            return;
        }
        while self.trail.len() >= self.config.trail_capacity {
            self.trail.pop_front();
        }
        self.trail.push_back(p);
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("id", &self.id)
            .field("scenario", &self.config.name)
            .field("mode", &self.mode)
            .field("pose", &self.pose)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
