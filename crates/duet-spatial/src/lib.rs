//! `duet-spatial` – geometry, world layout and graph search.
//!
//! # Modules
//!
//! - [`geometry`] – pure math helpers shared by every component: angle
//!   wrapping, signed angular difference, clamping, Box–Muller Gaussian
//!   sampling and Euclidean distance.
//! - [`world`] – [`World`][world::World]: the rectangular arena and its static
//!   rectangular obstacles.
//! - [`graph`] – [`Graph`][graph::Graph] plus the stateless A*
//!   [`find_route`][graph::find_route] pathfinder.

pub mod geometry;
pub mod graph;
pub mod world;

pub use graph::{Graph, GraphNode, find_route};
pub use world::{Rect, World};
