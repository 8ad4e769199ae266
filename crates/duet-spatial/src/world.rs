//! World layout: the rectangular arena and its static obstacles.
//!
//! Obstacles are axis-aligned rectangles.  Containment is a plain point test;
//! the motion model uses it to reject a step that would end inside an
//! obstacle ("stop at wall"), and [`World::clamp`] hard-clamps positions to
//! the arena.
//!
//! # Example
//!
//! ```rust
//! use duet_spatial::world::{Rect, World};
//! use duet_types::Point2;
//!
//! let world = World::new(600.0, 400.0)
//!     .with_obstacle(Rect::new(Point2::new(100.0, 100.0), Point2::new(200.0, 200.0)));
//!
//! assert!(world.is_blocked(Point2::new(150.0, 150.0)));
//! assert_eq!(world.clamp(Point2::new(-5.0, 450.0)), Point2::new(0.0, 400.0));
//! ```

use duet_types::Point2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Rect
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub min: Point2,
    pub max: Point2,
}

impl Rect {
    /// Create a rectangle from any two opposite corners.
    ///
    /// The corners are normalised so that `min ≤ max` per axis.
    pub fn new(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Rectangle with its minimum corner at the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Point2::new(0.0, 0.0), Point2::new(width, height))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// True when the point lies inside or on the boundary.
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Nearest point inside the rectangle.
    pub fn clamp(&self, p: Point2) -> Point2 {
        Point2::new(
            p.x.max(self.min.x).min(self.max.x),
            p.y.max(self.min.y).min(self.max.y),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// World
// ────────────────────────────────────────────────────────────────────────────

/// The arena a simulated agent moves in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct World {
    /// Hard boundary; positions are clamped into it after every step.
    pub bounds: Rect,
    /// Static obstacles; a step ending inside any of them is rejected.
    #[serde(default)]
    pub obstacles: Vec<Rect>,
}

impl World {
    /// An empty arena of the given size with its origin at `(0, 0)`.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            bounds: Rect::from_size(width, height),
            obstacles: Vec::new(),
        }
    }

    /// Add an obstacle (builder style).
    pub fn with_obstacle(mut self, obstacle: Rect) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Clamp `p` into the arena bounds.
    pub fn clamp(&self, p: Point2) -> Point2 {
        self.bounds.clamp(p)
    }

    /// True when `p` is inside any obstacle.
    pub fn is_blocked(&self, p: Point2) -> bool {
        self.obstacles.iter().any(|o| o.contains(p))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(600.0, 400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalises_corners() {
        let r = Rect::new(Point2::new(10.0, 0.0), Point2::new(0.0, 5.0));
        assert_eq!(r.min, Point2::new(0.0, 0.0));
        assert_eq!(r.max, Point2::new(10.0, 5.0));
        assert_eq!(r.width(), 10.0);
        assert_eq!(r.height(), 5.0);
    }

    #[test]
    fn rect_contains_boundary() {
        let r = Rect::from_size(10.0, 10.0);
        assert!(r.contains(Point2::new(0.0, 0.0)));
        assert!(r.contains(Point2::new(10.0, 10.0)));
        assert!(!r.contains(Point2::new(10.01, 5.0)));
    }

    #[test]
    fn world_clamps_to_bounds() {
        let world = World::new(100.0, 50.0);
        assert_eq!(world.clamp(Point2::new(120.0, -3.0)), Point2::new(100.0, 0.0));
        assert_eq!(world.clamp(Point2::new(20.0, 20.0)), Point2::new(20.0, 20.0));
    }

    #[test]
    fn world_blocked_only_inside_obstacles() {
        let world = World::new(100.0, 100.0)
            .with_obstacle(Rect::new(Point2::new(10.0, 10.0), Point2::new(20.0, 20.0)))
            .with_obstacle(Rect::new(Point2::new(60.0, 60.0), Point2::new(70.0, 90.0)));
        assert!(world.is_blocked(Point2::new(15.0, 15.0)));
        assert!(world.is_blocked(Point2::new(65.0, 80.0)));
        assert!(!world.is_blocked(Point2::new(40.0, 40.0)));
    }

    #[test]
    fn default_world_has_no_obstacles() {
        let world = World::default();
        assert!(world.obstacles.is_empty());
        assert_eq!(world.bounds.max, Point2::new(600.0, 400.0));
    }
}
