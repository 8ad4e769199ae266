//! Route cursor.
//!
//! A [`RouteFollower`] resolves a node route to positions once, then hands out
//! the waypoint the agent should steer to.  The cursor advances whenever the
//! agent comes within `tolerance` of the current waypoint; several waypoints
//! may be consumed in one call when they overlap.

use duet_spatial::graph::Graph;
use duet_types::{DuetError, NodeId, Point2};
use tracing::debug;

/// Waypoint radius used when none is configured.
pub const DEFAULT_WAYPOINT_TOLERANCE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteFollower {
    route: Vec<NodeId>,
    points: Vec<Point2>,
    cursor: usize,
    tolerance: f64,
}

impl RouteFollower {
    /// Resolve `route` against `graph`.
    ///
    /// Fails with [`DuetError::UnknownNode`] if any id is missing from the
    /// graph.  Edges are not checked, so a learned route that crosses a
    /// removed edge is still followed.
    pub fn new(route: Vec<NodeId>, graph: &Graph) -> Result<Self, DuetError> {
        let points = route
            .iter()
            .map(|id| {
                graph
                    .position(id)
                    .ok_or_else(|| DuetError::UnknownNode(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            route,
            points,
            cursor: 0,
            tolerance: DEFAULT_WAYPOINT_TOLERANCE,
        })
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    pub fn route(&self) -> &[NodeId] {
        &self.route
    }

    /// Index of the waypoint currently being steered to.  Equal to the
    /// route length once finished.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_waypoint(&self) -> Option<Point2> {
        self.points.get(self.cursor).copied()
    }

    pub fn current_node(&self) -> Option<&NodeId> {
        self.route.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.points.len()
    }

    /// Final waypoint of the route, if any.
    pub fn destination(&self) -> Option<Point2> {
        self.points.last().copied()
    }

    /// Advance past every waypoint within tolerance of `position`.
    /// Returns `true` when the cursor moved.
    pub fn advance_if_reached(&mut self, position: Point2) -> bool {
        let before = self.cursor;
        while let Some(waypoint) = self.current_waypoint() {
            if position.distance_to(waypoint) > self.tolerance {
                break;
            }
            self.cursor += 1;
        }
        if self.cursor != before {
            debug!(
                cursor = self.cursor,
                node = self.current_node().map(String::as_str).unwrap_or("<end>"),
                "route cursor advanced"
            );
        }
        self.cursor != before
    }

    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Graph {
        Graph::new()
            .with_node("A", 0.0, 0.0)
            .with_node("B", 100.0, 0.0)
            .with_node("C", 200.0, 0.0)
            .with_edge("A", "B")
            .with_edge("B", "C")
    }

    fn ids(v: &[&str]) -> Vec<NodeId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_node_is_rejected() {
        let err = RouteFollower::new(ids(&["A", "Q"]), &line_graph()).unwrap_err();
        assert_eq!(err, DuetError::UnknownNode("Q".to_string()));
    }

    #[test]
    fn cursor_walks_waypoints() {
        let mut f = RouteFollower::new(ids(&["A", "B", "C"]), &line_graph()).unwrap();
        assert_eq!(f.current_waypoint(), Some(Point2::new(0.0, 0.0)));

        assert!(f.advance_if_reached(Point2::new(2.0, 0.0)));
        assert_eq!(f.current_node().map(String::as_str), Some("B"));

        assert!(!f.advance_if_reached(Point2::new(50.0, 0.0)));
        assert_eq!(f.cursor(), 1);

        f.advance_if_reached(Point2::new(99.0, 1.0));
        f.advance_if_reached(Point2::new(200.0, 0.0));
        assert!(f.is_finished());
        assert_eq!(f.current_waypoint(), None);
        assert_eq!(f.destination(), Some(Point2::new(200.0, 0.0)));
    }

    #[test]
    fn overlapping_waypoints_consumed_together() {
        let g = line_graph().with_node("B2", 101.0, 0.0);
        let mut f = RouteFollower::new(ids(&["B", "B2", "C"]), &g).unwrap();
        f.advance_if_reached(Point2::new(100.5, 0.0));
        assert_eq!(f.cursor(), 2);
    }

    #[test]
    fn empty_route_is_finished() {
        let f = RouteFollower::new(Vec::new(), &line_graph()).unwrap();
        assert!(f.is_finished());
        assert!(f.destination().is_none());
    }

    #[test]
    fn restart_rewinds() {
        let mut f = RouteFollower::new(ids(&["A", "B"]), &line_graph())
            .unwrap()
            .with_tolerance(1.0);
        f.advance_if_reached(Point2::new(0.5, 0.0));
        assert_eq!(f.cursor(), 1);
        f.restart();
        assert_eq!(f.cursor(), 0);
    }
}
