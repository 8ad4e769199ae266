//! `duet-runtime` – the per-panel simulation engine.
//!
//! Wires the spatial, perception, motion and policy crates into a single
//! frame-driven [`Simulation`] and adds everything around it that a host
//! needs: scenario configuration, built-in presets, scripted demo playback
//! and logging setup.
//!
//! # Modules
//!
//! - [`simulation`] – [`Simulation`][simulation::Simulation]: owns one
//!   agent's pose, belief, route and label and advances them on every
//!   [`tick`][simulation::Simulation::tick].
//! - [`sequencer`] – [`Sequencer`][sequencer::Sequencer]: looping demo
//!   script with exact, carry-over phase timing.
//! - [`config`] – [`ScenarioConfig`][config::ScenarioConfig]: TOML scenario
//!   files with per-field defaults and a generated JSON schema.
//! - [`scenarios`] – the built-in presets.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   `tracing` subscriber with optional OTLP span export.
//!
//! # Example
//!
//! ```rust
//! use duet_runtime::{Simulation, scenarios};
//!
//! let mut sim = Simulation::new(scenarios::stubborn().with_seed(1)).unwrap();
//! for _ in 0..60 {
//!     sim.tick(1.0 / 60.0);
//! }
//! assert_eq!(sim.target(), Some(sim.config().landmarks[1]));
//! ```

pub mod config;
pub mod scenarios;
pub mod sequencer;
pub mod simulation;
pub mod telemetry;

pub use config::{ScenarioConfig, load_scenario, scenario_schema};
pub use sequencer::{PhaseDescriptor, Sequencer};
pub use simulation::{Simulation, Snapshot};
pub use telemetry::{TracerProviderGuard, init_tracing};
