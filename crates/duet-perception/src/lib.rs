//! `duet-perception` – the two-hypothesis belief filter.
//!
//! Turns noisy bearing readings to a fixed beacon into a belief over two
//! competing location hypotheses.
//!
//! # Modules
//!
//! - [`gate`] – [`SensingGate`][gate::SensingGate] (where and how often a
//!   reading may be taken) and [`NoiseModel`][gate::NoiseModel] (how noisy it
//!   is at a given distance from the vantage point).
//! - [`belief`] – [`Belief`][belief::Belief], the normalised two-element
//!   probability vector, and [`BeliefFilter`][belief::BeliefFilter], the
//!   sequential Bayesian update driven by the gate.

pub mod belief;
pub mod gate;

pub use belief::{Belief, BeliefConfig, BeliefFilter, Measurement};
pub use gate::{NoiseModel, SensingGate};
