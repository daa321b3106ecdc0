//! Distance-to-boundary field backed by an R\*-tree of boundary segments.
//!
//! The skeleton builder queries this field for every skeleton node, so
//! lookups must be cheap: the polygon's boundary edges (outer ring and
//! holes) are bulk-loaded into an R-tree once and each query is a
//! nearest-neighbor walk.
//!
//! The same tree doubles as the degeneracy probe: a simple polygon has
//! no intersections between non-adjacent boundary edges, so any hit
//! found by an envelope query is a self-intersection.

use geo::line_measures::Distance;
use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Closest, ClosestPoint, Euclidean, Line};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use crate::polygon::Polygon;
use crate::types::Point;

/// Identifies a boundary edge within the polygon.
///
/// `(ring_index, edge_index)` — ring 0 is the outer ring, holes follow;
/// edge `i` runs from ring vertex `i` to vertex `i + 1` (wrapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeId {
    ring: usize,
    edge: usize,
}

/// A `geo::Line` tagged with its [`EdgeId`], suitable for R\*-tree
/// insertion.
type IndexedEdge = GeomWithData<Line<f64>, EdgeId>;

/// Convert a pipeline `Point` to a `geo::Coord`.
const fn point_to_coord(p: Point) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

/// Spatial index over a polygon's boundary edges.
pub struct BoundaryField {
    tree: RTree<IndexedEdge>,
    /// Vertex count per ring, for edge adjacency tests.
    ring_lens: Vec<usize>,
}

impl BoundaryField {
    /// Build the field from all boundary edges of `polygon`.
    #[must_use]
    pub fn new(polygon: &Polygon) -> Self {
        let edges: Vec<IndexedEdge> = polygon
            .rings()
            .enumerate()
            .flat_map(|(ring_idx, ring)| {
                ring.edges().enumerate().map(move |(edge_idx, (a, b))| {
                    GeomWithData::new(
                        Line::new(point_to_coord(a), point_to_coord(b)),
                        EdgeId {
                            ring: ring_idx,
                            edge: edge_idx,
                        },
                    )
                })
            })
            .collect();
        let ring_lens = polygon.rings().map(crate::polygon::Ring::len).collect();
        Self {
            tree: RTree::bulk_load(edges),
            ring_lens,
        }
    }

    /// Distance from `p` to the nearest boundary edge.
    ///
    /// Returns infinity for a polygon with no edges (callers reject
    /// such input as degenerate before querying).
    #[must_use]
    pub fn distance(&self, p: Point) -> f64 {
        let query = geo::Point::new(p.x, p.y);
        self.tree.nearest_neighbor(&query).map_or(f64::INFINITY, |edge| {
            let closest = closest_point_on_line(edge.geom(), &query);
            Euclidean.distance(query, closest)
        })
    }

    /// Locate a self-intersection of the boundary, if any.
    ///
    /// Checks every pair of non-adjacent edges whose envelopes overlap.
    /// Edges from different rings must not intersect at all (a hole
    /// crossing the outer ring is just as degenerate as a ring crossing
    /// itself). Returns a representative point of the first violation
    /// found.
    #[must_use]
    pub fn self_intersection(&self) -> Option<Point> {
        for edge in self.tree.iter() {
            let envelope = edge_envelope(edge.geom());
            for other in self.tree.locate_in_envelope_intersecting(&envelope) {
                // Each unordered pair once.
                if other.data <= edge.data {
                    continue;
                }
                if self.edges_adjacent(edge.data, other.data) {
                    continue;
                }
                match line_intersection(*edge.geom(), *other.geom()) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        return Some(Point::new(intersection.x, intersection.y));
                    }
                    Some(LineIntersection::Collinear { intersection }) => {
                        return Some(Point::new(intersection.start.x, intersection.start.y));
                    }
                    None => {}
                }
            }
        }
        None
    }

    /// Whether two edges share an endpoint by construction (same ring,
    /// consecutive indices, wrapping around the ring).
    fn edges_adjacent(&self, a: EdgeId, b: EdgeId) -> bool {
        if a.ring != b.ring {
            return false;
        }
        let n = self.ring_lens[a.ring];
        if n == 0 {
            return false;
        }
        let diff = a.edge.abs_diff(b.edge);
        diff == 1 || diff == n - 1
    }
}

/// Closest point on a line segment to a query point.
fn closest_point_on_line(line: &Line<f64>, query: &geo::Point<f64>) -> geo::Point<f64> {
    match line.closest_point(query) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => line.start.into(),
    }
}

/// Axis-aligned envelope of a segment.
fn edge_envelope(line: &Line<f64>) -> AABB<geo::Point<f64>> {
    AABB::from_corners(
        geo::Point::new(line.start.x.min(line.end.x), line.start.y.min(line.end.y)),
        geo::Point::new(line.start.x.max(line.end.x), line.start.y.max(line.end.y)),
    )
}
