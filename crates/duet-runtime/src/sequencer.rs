//! [`Sequencer`] – scripted demo playback.
//!
//! A demo is an ordered, endlessly looping list of [`PhaseDescriptor`]s.
//! The sequencer is driven by the same clamped delta-time as the rest of the
//! simulation.  When the time spent in a phase reaches its duration the cursor
//! moves to `(index + 1) mod len` and the overshoot is carried into the new
//! phase, so phase boundaries land at exact multiples of simulated time.
//!
//! # Example
//!
//! ```rust
//! use duet_runtime::sequencer::{PhaseDescriptor, Sequencer};
//! use duet_types::MovementKind;
//!
//! let mut seq = Sequencer::new(vec![
//!     PhaseDescriptor::new("go", 1.0, MovementKind::Outbound),
//!     PhaseDescriptor::new("wait", 0.5, MovementKind::Hold),
//! ])
//! .unwrap();
//!
//! assert_eq!(seq.advance(1.2), vec![1]);
//! assert_eq!(seq.current().id, "wait");
//! assert!((seq.elapsed() - 0.2).abs() < 1e-9);
//! ```

use duet_types::{DuetError, Goal, Mode, MovementKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shortest phase accepted; keeps a single advance from cycling unboundedly.
pub const MIN_PHASE_DURATION: f64 = 1e-3;

// ────────────────────────────────────────────────────────────────────────────
// PhaseDescriptor
// ────────────────────────────────────────────────────────────────────────────

/// One step of a demo script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhaseDescriptor {
    pub id: String,
    /// Phase length in simulated seconds.
    pub duration: f64,
    pub movement: MovementKind,
    /// Mode switched to on entry.
    #[serde(default)]
    pub mode: Option<Mode>,
    /// Goal set on entry.
    #[serde(default)]
    pub goal: Option<Goal>,
    /// Reinitialise pose, belief, trail and route before applying mode/goal.
    #[serde(default)]
    pub reset_on_enter: bool,
    /// Clear the trail on entry.
    #[serde(default)]
    pub fade_trails: bool,
}

impl PhaseDescriptor {
    pub fn new(id: impl Into<String>, duration: f64, movement: MovementKind) -> Self {
        Self {
            id: id.into(),
            duration,
            movement,
            mode: None,
            goal: None,
            reset_on_enter: false,
            fade_trails: false,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = Some(goal);
        self
    }

    /// Mark the phase as a full reset that also clears the trail.
    pub fn resetting(mut self) -> Self {
        self.reset_on_enter = true;
        self.fade_trails = true;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sequencer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Sequencer {
    phases: Vec<PhaseDescriptor>,
    index: usize,
    elapsed: f64,
}

impl Sequencer {
    /// Build a sequencer positioned at the start of phase 0.
    ///
    /// Fails with [`DuetError::InvalidConfig`] for an empty script or a phase
    /// shorter than [`MIN_PHASE_DURATION`].
    pub fn new(phases: Vec<PhaseDescriptor>) -> Result<Self, DuetError> {
        if phases.is_empty() {
            return Err(DuetError::InvalidConfig("demo script has no phases".to_string()));
        }
        if let Some(bad) = phases
            .iter()
            .find(|p| !p.duration.is_finite() || p.duration < MIN_PHASE_DURATION)
        {
            return Err(DuetError::InvalidConfig(format!(
                "phase '{}' has invalid duration {}",
                bad.id, bad.duration
            )));
        }
        Ok(Self {
            phases,
            index: 0,
            elapsed: 0.0,
        })
    }

    /// Advance by `dt` seconds.  Returns the indices of every phase entered,
    /// in order (empty when the phase did not change).
    pub fn advance(&mut self, dt: f64) -> Vec<usize> {
        let mut entered = Vec::new();
        if !dt.is_finite() || dt <= 0.0 {
            return entered;
        }
        self.elapsed += dt;
        while self.elapsed >= self.phases[self.index].duration {
            self.elapsed -= self.phases[self.index].duration;
            self.index = (self.index + 1) % self.phases.len();
            entered.push(self.index);
        }
        entered
    }

    /// Return to the start of phase 0.
    pub fn restart(&mut self) {
        self.index = 0;
        self.elapsed = 0.0;
    }

    pub fn current(&self) -> &PhaseDescriptor {
        &self.phases[self.index]
    }

    pub fn phase(&self, index: usize) -> Option<&PhaseDescriptor> {
        self.phases.get(index)
    }

    pub fn phases(&self) -> &[PhaseDescriptor] {
        &self.phases
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Seconds spent in the current phase.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Progress through the current phase in `[0, 1)`.
    pub fn fraction(&self) -> f64 {
        (self.elapsed / self.current().duration).clamp(0.0, 1.0)
    }

    /// Length of one full loop of the script.
    pub fn cycle_duration(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_phase() -> Sequencer {
        Sequencer::new(vec![
            PhaseDescriptor::new("a", 1.0, MovementKind::Outbound),
            PhaseDescriptor::new("b", 2.0, MovementKind::Hold),
            PhaseDescriptor::new("c", 0.5, MovementKind::ResetTransition),
        ])
        .unwrap()
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            Sequencer::new(Vec::new()),
            Err(DuetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = Sequencer::new(vec![PhaseDescriptor::new("z", 0.0, MovementKind::Hold)])
            .unwrap_err();
        assert!(err.to_string().contains("'z'"));
    }

    #[test]
    fn wraps_around_with_carry() {
        let mut seq = three_phase();
        let entered = seq.advance(3.5 + 0.05);
        assert_eq!(entered, vec![1, 2, 0]);
        assert_eq!(seq.index(), 0);
        assert!((seq.elapsed() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn small_ticks_match_one_big_step() {
        let mut seq = three_phase();
        for _ in 0..71 {
            seq.advance(0.05);
        }
        assert_eq!(seq.index(), 0);
        assert!((seq.elapsed() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn boundary_is_inclusive() {
        let mut seq = three_phase();
        assert_eq!(seq.advance(1.0), vec![1]);
        assert_eq!(seq.elapsed(), 0.0);
    }

    #[test]
    fn fraction_and_restart() {
        let mut seq = three_phase();
        seq.advance(1.5);
        assert!((seq.fraction() - 0.25).abs() < 1e-9);
        seq.restart();
        assert_eq!(seq.index(), 0);
        assert_eq!(seq.elapsed(), 0.0);
        assert!((seq.cycle_duration() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut seq = three_phase();
        assert!(seq.advance(f64::NAN).is_empty());
        assert!(seq.advance(-1.0).is_empty());
        assert_eq!(seq.elapsed(), 0.0);
    }
}
