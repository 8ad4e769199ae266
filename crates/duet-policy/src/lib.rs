//! `duet-policy` – action selection from belief state.
//!
//! - [`policy`] – the explore-vs-commit state machine that turns belief,
//!   mode and prior into a motion target and an action label.
//! - [`transition`] – edge-triggered feed of action-label changes.

pub mod policy;
pub mod transition;

pub use policy::{ActionPolicy, Decision, PolicyConfig, PolicyInputs, PolicyState, RouteStatus};
pub use transition::{LabelTransition, TransitionLog};
