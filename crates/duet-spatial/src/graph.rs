//! Route graph and A* pathfinder.
//!
//! A [`Graph`] maps node ids to positions and neighbour lists.  Edges are
//! directional exactly as listed: if `A` lists `B` but `B` does not list `A`,
//! the edge can only be traversed from `A` to `B`.  [`Graph::connect`] adds
//! both directions.
//!
//! [`find_route`] runs A* with the straight-line distance to the goal as the
//! heuristic and cumulative Euclidean edge length as the cost.  It keeps no
//! state between calls; re-invoke it whenever the goal or the graph changes.
//!
//! # Tie-break
//!
//! Open-set entries are ordered by estimated total cost `f`; among entries
//! with equal `f` the node with the lexicographically smaller id is expanded
//! first.  A node's predecessor is only replaced by a strictly cheaper path,
//! so the first equal-cost path discovered wins.
//!
//! # Example
//!
//! ```rust
//! use duet_spatial::graph::{Graph, find_route};
//!
//! let graph = Graph::new()
//!     .with_node("A", 0.0, 0.0)
//!     .with_node("B", 100.0, 0.0)
//!     .with_node("C", 200.0, 0.0)
//!     .with_edge("A", "B")
//!     .with_edge("B", "C");
//!
//! let route = find_route(&graph, "A", "C").unwrap();
//! assert_eq!(route, vec!["A", "B", "C"]);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use duet_types::{NodeId, Point2};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ────────────────────────────────────────────────────────────────────────────
// Graph
// ────────────────────────────────────────────────────────────────────────────

/// A single graph node: a position plus the ids it has outgoing edges to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphNode {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub neighbors: Vec<NodeId>,
}

impl GraphNode {
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Static node/edge graph used for route planning.
///
/// Backed by a `BTreeMap` so iteration order (and therefore every search) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Graph {
    nodes: BTreeMap<NodeId, GraphNode>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or move) a node, keeping any neighbours it already has.
    pub fn with_node(mut self, id: impl Into<NodeId>, x: f64, y: f64) -> Self {
        self.insert_node(id, x, y);
        self
    }

    /// Add an undirected edge (builder style).
    pub fn with_edge(mut self, a: &str, b: &str) -> Self {
        self.connect(a, b);
        self
    }

    /// Insert a node or update the position of an existing one.
    pub fn insert_node(&mut self, id: impl Into<NodeId>, x: f64, y: f64) {
        let node = self.nodes.entry(id.into()).or_insert(GraphNode {
            x,
            y,
            neighbors: Vec::new(),
        });
        node.x = x;
        node.y = y;
    }

    /// Add a one-directional edge `from → to`.  Unknown `from` ids are
    /// ignored; unknown `to` ids are kept and skipped during search.
    pub fn add_directed_edge(&mut self, from: &str, to: &str) {
        if let Some(node) = self.nodes.get_mut(from)
            && !node.neighbors.iter().any(|n| n == to)
        {
            node.neighbors.push(to.to_string());
        }
    }

    /// Add edges in both directions.
    pub fn connect(&mut self, a: &str, b: &str) {
        self.add_directed_edge(a, b);
        self.add_directed_edge(b, a);
    }

    /// Copy of this graph with the edge between `a` and `b` removed in both
    /// directions (e.g. a door closing).
    pub fn without_edge(&self, a: &str, b: &str) -> Self {
        let mut copy = self.clone();
        if let Some(node) = copy.nodes.get_mut(a) {
            node.neighbors.retain(|n| n != b);
        }
        if let Some(node) = copy.nodes.get_mut(b) {
            node.neighbors.retain(|n| n != a);
        }
        copy
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn position(&self, id: &str) -> Option<Point2> {
        self.nodes.get(id).map(GraphNode::position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// The node closest to `p`; ties resolve to the smaller id.
    pub fn nearest_node(&self, p: Point2) -> Option<&NodeId> {
        let mut best: Option<(&NodeId, f64)> = None;
        for (id, node) in &self.nodes {
            let d = node.position().distance_to(p);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((id, d)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Sum of Euclidean edge lengths along `route`, or `None` if the route
    /// references an unknown node or a missing edge.
    pub fn route_length(&self, route: &[NodeId]) -> Option<f64> {
        let mut total = 0.0;
        for pair in route.windows(2) {
            let from = self.nodes.get(&pair[0])?;
            if !from.neighbors.contains(&pair[1]) {
                return None;
            }
            let to = self.nodes.get(&pair[1])?;
            total += from.position().distance_to(to.position());
        }
        if route.len() == 1 && !self.contains(&route[0]) {
            return None;
        }
        Some(total)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// A* search
// ────────────────────────────────────────────────────────────────────────────

/// Open-set entry; ordered so that `BinaryHeap` pops the lowest `f` first and,
/// on equal `f`, the smallest node id.
#[derive(Debug, Clone)]
struct OpenEntry {
    id: NodeId,
    g: f64,
    f: f64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest route from `start` to `goal` by cumulative edge length.
///
/// Returns the ordered node ids including both endpoints, `vec![start]` when
/// `start == goal`, or `None` when either endpoint is unknown or the goal is
/// unreachable.
pub fn find_route(graph: &Graph, start: &str, goal: &str) -> Option<Vec<NodeId>> {
    let goal_pos = graph.position(goal)?;
    graph.position(start)?;

    let heuristic = |id: &str| {
        graph
            .position(id)
            .map(|p| p.distance_to(goal_pos))
            .unwrap_or(f64::INFINITY)
    };

    let mut open = BinaryHeap::new();
    let mut closed: HashSet<NodeId> = HashSet::new();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();

    g_score.insert(start.to_string(), 0.0);
    open.push(OpenEntry {
        id: start.to_string(),
        g: 0.0,
        f: heuristic(start),
    });

    let mut expanded = 0usize;

    while let Some(current) = open.pop() {
        if current.id == goal {
            trace!(expanded, cost = current.g, "route found");
            return Some(reconstruct(&came_from, goal));
        }
        if !closed.insert(current.id.clone()) {
            continue;
        }
        expanded += 1;

        let Some(node) = graph.node(&current.id) else {
            continue;
        };
        let here = node.position();

        for next in &node.neighbors {
            if closed.contains(next) {
                continue;
            }
            let Some(next_pos) = graph.position(next) else {
                trace!(from = %current.id, to = %next, "skipping edge to unknown node");
                continue;
            };
            let tentative = current.g + here.distance_to(next_pos);
            let known = g_score.get(next).copied().unwrap_or(f64::INFINITY);
            if tentative < known {
                came_from.insert(next.clone(), current.id.clone());
                g_score.insert(next.clone(), tentative);
                open.push(OpenEntry {
                    id: next.clone(),
                    g: tentative,
                    f: tentative + heuristic(next),
                });
            }
        }
    }

    debug!(start, goal, expanded, "no route found");
    None
}

fn reconstruct(came_from: &HashMap<NodeId, NodeId>, goal: &str) -> Vec<NodeId> {
    let mut route = vec![goal.to_string()];
    let mut current = goal;
    while let Some(prev) = came_from.get(current) {
        route.push(prev.clone());
        current = prev;
    }
    route.reverse();
    route
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
