//! `duet-motion` – agent kinematics for the Duet simulation core.
//!
//! - [`kinematics`] – per-tick heading interpolation, speed modulation and
//!   world clamping.
//! - [`route`] – cursor that walks a node route one waypoint at a time.

pub mod kinematics;
pub mod route;

pub use kinematics::{MotionConfig, MotionModel, MotionPolicy, StepOutcome, sanitize_dt};
pub use route::RouteFollower;
