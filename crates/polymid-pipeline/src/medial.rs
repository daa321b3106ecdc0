//! Medial path selection: prune the skeleton graph to its dominant spine.
//!
//! The spine is the weighted graph diameter restricted to leaf pairs:
//! the two leaves with the maximum shortest-path distance between them,
//! with edge length as the weight. Everything off that path (shorter
//! spurs, typically reflex-vertex artifacts, and hole cycles) is
//! discarded.
//!
//! Near-ties are resolved by preferring the pair whose path keeps the
//! higher mean boundary distance, so a spurious near-boundary path never
//! beats an equally long centered one. Exact ties fall back to the
//! smallest node-index pair; indices are assigned in raster order, so
//! selection is deterministic across runs.

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::NodeIndex;

use crate::skeleton::SkeletonGraph;
use crate::types::{PipelineError, Point, Polyline};

/// Leaf pairs within this relative distance of the maximum are treated
/// as tied and re-ranked by mean boundary distance.
const DIAMETER_REL_TOLERANCE: f64 = 1e-3;

/// One vertex of the selected medial path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    /// Vertex position.
    pub point: Point,
    /// Distance to the nearest polygon boundary, inherited from the
    /// skeleton node.
    pub boundary_dist: f64,
    /// Cumulative arc length from the path start.
    pub arc_pos: f64,
}

/// An ordered simple path through the skeleton, parametrized by
/// cumulative arc length.
#[derive(Debug, Clone)]
pub struct MedialPath {
    vertices: Vec<PathVertex>,
}

impl MedialPath {
    /// Build a path from raw vertices (unit tests only).
    #[cfg(test)]
    pub(crate) const fn from_vertices(vertices: Vec<PathVertex>) -> Self {
        Self { vertices }
    }

    /// The path vertices in order.
    #[must_use]
    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    /// Number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the path has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Total arc length of the path.
    #[must_use]
    pub fn total_arc(&self) -> f64 {
        self.vertices.last().map_or(0.0, |v| v.arc_pos)
    }

    /// The path geometry without per-vertex metadata.
    #[must_use]
    pub fn polyline(&self) -> Polyline {
        Polyline::new(self.vertices.iter().map(|v| v.point).collect())
    }
}

/// Select the dominant medial path from a skeleton graph.
///
/// # Errors
///
/// Returns [`PipelineError::DisconnectedSkeleton`] when the graph has
/// fewer than two leaves or no leaf pair is connected by a path of
/// positive length.
pub fn select(skeleton: &SkeletonGraph) -> Result<MedialPath, PipelineError> {
    let graph = skeleton.graph();
    let leaves = skeleton.leaves();
    if leaves.len() < 2 {
        return Err(PipelineError::DisconnectedSkeleton);
    }

    // Shortest-path cost between every leaf pair (Dijkstra from each
    // leaf; leaves are few compared to skeleton nodes).
    let mut best_cost = 0.0_f64;
    let mut pairs: Vec<(NodeIndex, NodeIndex, f64)> = Vec::new();
    for (i, &a) in leaves.iter().enumerate() {
        let costs = dijkstra(graph, a, None, |e| *e.weight());
        for &b in &leaves[i + 1..] {
            if let Some(&cost) = costs.get(&b)
                && cost > 0.0
            {
                pairs.push((a, b, cost));
                best_cost = best_cost.max(cost);
            }
        }
    }
    if best_cost <= 0.0 {
        return Err(PipelineError::DisconnectedSkeleton);
    }

    // Keep near-maximal pairs, then rank by mean boundary distance
    // along the actual path. Pairs iterate in ascending index order and
    // replacement requires a strictly better mean, so exact ties keep
    // the smallest pair.
    pairs.retain(|&(_, _, cost)| cost >= best_cost * (1.0 - DIAMETER_REL_TOLERANCE));
    pairs.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));

    let mut best: Option<(f64, Vec<NodeIndex>)> = None;
    for &(a, b, _) in &pairs {
        let Some((_, path)) = astar(graph, a, |n| n == b, |e| *e.weight(), |_| 0.0) else {
            continue;
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_dist = path
            .iter()
            .map(|&n| graph[n].boundary_dist)
            .sum::<f64>()
            / path.len() as f64;
        let better = best
            .as_ref()
            .is_none_or(|(current, _)| mean_dist > *current);
        if better {
            best = Some((mean_dist, path));
        }
    }

    let Some((_, path)) = best else {
        return Err(PipelineError::DisconnectedSkeleton);
    };

    let mut vertices = Vec::with_capacity(path.len());
    let mut arc = 0.0;
    let mut previous: Option<Point> = None;
    for &node in &path {
        let weight = &graph[node];
        if let Some(prev) = previous {
            arc += prev.distance(weight.point);
        }
        vertices.push(PathVertex {
            point: weight.point,
            boundary_dist: weight.boundary_dist,
            arc_pos: arc,
        });
        previous = Some(weight.point);
    }

    Ok(MedialPath { vertices })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::skeleton::SkeletonNode;
    use petgraph::graph::UnGraph;

    fn node(x: f64, y: f64, dist: f64) -> SkeletonNode {
        SkeletonNode {
            point: Point::new(x, y),
            boundary_dist: dist,
        }
    }

    #[test]
    fn straight_chain_selects_full_path() {
        let mut g = UnGraph::new_undirected();
        let a = g.add_node(node(0.0, 0.0, 1.0));
        let b = g.add_node(node(1.0, 0.0, 2.0));
        let c = g.add_node(node(2.0, 0.0, 1.0));
        g.add_edge(a, b, 1.0);
        g.add_edge(b, c, 1.0);

        let path = select(&SkeletonGraph::from_graph(g)).unwrap();
        assert_eq!(path.len(), 3);
        assert!((path.total_arc() - 2.0).abs() < 1e-12);
        assert_eq!(path.vertices()[0].point, Point::new(0.0, 0.0));
        assert_eq!(path.vertices()[2].point, Point::new(2.0, 0.0));
    }

    #[test]
    fn arc_positions_are_cumulative() {
        let mut g = UnGraph::new_undirected();
        let a = g.add_node(node(0.0, 0.0, 1.0));
        let b = g.add_node(node(3.0, 0.0, 1.0));
        let c = g.add_node(node(3.0, 4.0, 1.0));
        g.add_edge(a, b, 3.0);
        g.add_edge(b, c, 4.0);

        let path = select(&SkeletonGraph::from_graph(g)).unwrap();
        let arcs: Vec<f64> = path.vertices().iter().map(|v| v.arc_pos).collect();
        assert_eq!(arcs, vec![0.0, 3.0, 7.0]);
    }

    #[test]
    fn branches_are_pruned_to_the_longest_pair() {
        // Y shape: center with branches of length 5, 4, and 1.
        let mut g = UnGraph::new_undirected();
        let center = g.add_node(node(0.0, 0.0, 2.0));
        let long = g.add_node(node(5.0, 0.0, 1.0));
        let medium = g.add_node(node(-4.0, 0.0, 1.0));
        let short = g.add_node(node(0.0, 1.0, 1.0));
        g.add_edge(center, long, 5.0);
        g.add_edge(center, medium, 4.0);
        g.add_edge(center, short, 1.0);

        let path = select(&SkeletonGraph::from_graph(g)).unwrap();
        assert_eq!(path.len(), 3);
        assert!((path.total_arc() - 9.0).abs() < 1e-12);
        let points: Vec<Point> = path.vertices().iter().map(|v| v.point).collect();
        assert!(!points.contains(&Point::new(0.0, 1.0)), "spur not pruned");
    }

    #[test]
    fn tie_break_prefers_higher_mean_boundary_distance() {
        // Cross: four branches of equal length from a shared center.
        // Two arms are deep inside the shape (high boundary distance),
        // two hug the boundary. All diameter pairs cost 2.0.
        let mut g = UnGraph::new_undirected();
        let center = g.add_node(node(0.0, 0.0, 3.0));
        let deep_a = g.add_node(node(1.0, 0.0, 3.0));
        let deep_b = g.add_node(node(-1.0, 0.0, 3.0));
        let shallow_a = g.add_node(node(0.0, 1.0, 0.2));
        let shallow_b = g.add_node(node(0.0, -1.0, 0.2));
        g.add_edge(center, deep_a, 1.0);
        g.add_edge(center, deep_b, 1.0);
        g.add_edge(center, shallow_a, 1.0);
        g.add_edge(center, shallow_b, 1.0);

        let path = select(&SkeletonGraph::from_graph(g)).unwrap();
        let points: Vec<Point> = path.vertices().iter().map(|v| v.point).collect();
        assert!(points.contains(&Point::new(1.0, 0.0)));
        assert!(points.contains(&Point::new(-1.0, 0.0)));
    }

    #[test]
    fn tie_break_is_deterministic_for_exact_ties() {
        // Perfectly symmetric cross: every pair has identical cost and
        // identical mean boundary distance. Repeated runs must agree.
        let build = || {
            let mut g = UnGraph::new_undirected();
            let center = g.add_node(node(0.0, 0.0, 1.0));
            let tips = [
                g.add_node(node(1.0, 0.0, 1.0)),
                g.add_node(node(-1.0, 0.0, 1.0)),
                g.add_node(node(0.0, 1.0, 1.0)),
                g.add_node(node(0.0, -1.0, 1.0)),
            ];
            for tip in tips {
                g.add_edge(center, tip, 1.0);
            }
            SkeletonGraph::from_graph(g)
        };

        let first = select(&build()).unwrap();
        for _ in 0..5 {
            let again = select(&build()).unwrap();
            assert_eq!(first.polyline(), again.polyline());
        }
    }

    #[test]
    fn single_node_has_no_path() {
        let mut g = UnGraph::new_undirected();
        g.add_node(node(0.0, 0.0, 1.0));
        assert!(matches!(
            select(&SkeletonGraph::from_graph(g)),
            Err(PipelineError::DisconnectedSkeleton)
        ));
    }

    #[test]
    fn pure_cycle_has_no_leaves() {
        let mut g = UnGraph::new_undirected();
        let a = g.add_node(node(0.0, 0.0, 1.0));
        let b = g.add_node(node(1.0, 0.0, 1.0));
        let c = g.add_node(node(0.5, 1.0, 1.0));
        g.add_edge(a, b, 1.0);
        g.add_edge(b, c, 1.0);
        g.add_edge(c, a, 1.0);
        assert!(matches!(
            select(&SkeletonGraph::from_graph(g)),
            Err(PipelineError::DisconnectedSkeleton)
        ));
    }

    #[test]
    fn leaves_in_separate_components_are_disconnected() {
        let mut g = UnGraph::new_undirected();
        // Two disjoint single edges: every leaf pair within a component
        // connects, but the across-component diameter does not exist.
        // The in-component pairs still yield a valid (short) path.
        let a = g.add_node(node(0.0, 0.0, 1.0));
        let b = g.add_node(node(5.0, 0.0, 1.0));
        let c = g.add_node(node(10.0, 10.0, 1.0));
        let d = g.add_node(node(11.0, 10.0, 1.0));
        g.add_edge(a, b, 5.0);
        g.add_edge(c, d, 1.0);

        let path = select(&SkeletonGraph::from_graph(g)).unwrap();
        // The longer component wins.
        assert!((path.total_arc() - 5.0).abs() < 1e-12);
    }
}
