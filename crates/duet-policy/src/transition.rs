//! [`TransitionLog`] – edge-triggered action-label feed.
//!
//! The policy recomputes its label every tick; display consumers only want
//! to hear about *changes*.  [`TransitionLog::observe`] compares each label
//! with the previous one and queues a [`LabelTransition`] when they differ.
//! [`TransitionLog::drain`] hands queued transitions out exactly once, in
//! order.
//!
//! # Example
//!
//! ```rust
//! use duet_policy::transition::TransitionLog;
//! use duet_types::{ActionLabel, Hypothesis};
//!
//! let mut log = TransitionLog::new();
//! log.observe(ActionLabel::Localizing, 0.1);
//! log.observe(ActionLabel::Localizing, 0.2); // unchanged → nothing queued
//! log.observe(ActionLabel::Committed(Hypothesis::First), 3.4);
//!
//! let feed = log.drain();
//! assert_eq!(feed.len(), 2);
//! assert_eq!(feed[1].to, ActionLabel::Committed(Hypothesis::First));
//! assert!(log.drain().is_empty());
//! ```

use std::collections::VecDeque;

use duet_types::ActionLabel;
use tracing::warn;

/// Undrained transitions kept before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 256;

/// One label change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelTransition {
    pub from: ActionLabel,
    pub to: ActionLabel,
    /// Simulated time of the change, in seconds since the last reset.
    pub at: f64,
}

#[derive(Debug, Clone)]
pub struct TransitionLog {
    current: ActionLabel,
    pending: VecDeque<LabelTransition>,
    capacity: usize,
}

impl TransitionLog {
    /// Empty log whose current label is [`ActionLabel::Idle`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            current: ActionLabel::Idle,
            pending: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Last observed label.
    pub fn current(&self) -> ActionLabel {
        self.current
    }

    /// Record `label`.  Returns the transition when it differs from the
    /// previous label.
    pub fn observe(&mut self, label: ActionLabel, at: f64) -> Option<LabelTransition> {
        if label == self.current {
            return None;
        }
        let transition = LabelTransition {
            from: self.current,
            to: label,
            at,
        };
        self.current = label;
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
            warn!(capacity = self.capacity, "transition feed full; dropping oldest entry");
        }
        self.pending.push_back(transition);
        Some(transition)
    }

    /// Number of undrained transitions.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Take every queued transition, oldest first.
    pub fn drain(&mut self) -> Vec<LabelTransition> {
        self.pending.drain(..).collect()
    }
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_types::Hypothesis;

    #[test]
    fn repeated_label_is_not_a_transition() {
        let mut log = TransitionLog::new();
        assert!(log.observe(ActionLabel::Idle, 0.0).is_none());
        assert!(log.observe(ActionLabel::Localizing, 0.1).is_some());
        assert!(log.observe(ActionLabel::Localizing, 0.2).is_none());
        assert_eq!(log.pending(), 1);
    }

    #[test]
    fn transitions_chain_in_order() {
        let mut log = TransitionLog::new();
        log.observe(ActionLabel::Localizing, 0.1);
        log.observe(ActionLabel::Committed(Hypothesis::Second), 0.5);
        log.observe(ActionLabel::Committed(Hypothesis::First), 2.0);

        let feed = log.drain();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].from, ActionLabel::Idle);
        assert_eq!(feed[1].to, feed[2].from);
        assert_eq!(feed[2].at, 2.0);
    }

    #[test]
    fn drain_delivers_each_transition_once() {
        let mut log = TransitionLog::new();
        log.observe(ActionLabel::Localizing, 0.1);
        assert_eq!(log.drain().len(), 1);
        assert!(log.drain().is_empty());
        log.observe(ActionLabel::Arrived, 1.0);
        let feed = log.drain();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].from, ActionLabel::Localizing);
    }

    #[test]
    fn full_feed_drops_oldest() {
        let mut log = TransitionLog::with_capacity(2);
        log.observe(ActionLabel::Localizing, 0.0);
        log.observe(ActionLabel::Verifying, 1.0);
        log.observe(ActionLabel::Arrived, 2.0);
        let feed = log.drain();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].to, ActionLabel::Verifying);
        assert_eq!(log.current(), ActionLabel::Arrived);
    }
}
