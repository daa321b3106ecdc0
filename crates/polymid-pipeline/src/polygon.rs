//! Polygon input type: ring ingestion, area, centroid, containment.
//!
//! Input rings are normalized on construction: a duplicated closing
//! point is stripped, the outer ring is oriented counter-clockwise and
//! holes clockwise. Rings are assumed simple (non-self-intersecting)
//! and the outer ring is assumed to enclose all holes; violations
//! beyond floating-point tolerance are caught later by the skeleton
//! builder's degeneracy checks, not here.

use serde::{Deserialize, Serialize};

use crate::finalize;
use crate::types::{Point, Polyline};

/// A closed simple loop, stored without the duplicated closing point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring(Vec<Point>);

impl Ring {
    /// Create a ring from an ordered point sequence.
    ///
    /// A shared first/last point is removed, matching the convention of
    /// most vector formats which close rings explicitly.
    #[must_use]
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() >= 2 {
            let first = points[0];
            if let Some(&last) = points.last()
                && last == first
            {
                points.pop();
            }
        }
        Self(points)
    }

    /// Returns a slice of the ring's points (closing point excluded).
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Returns the number of distinct vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the ring has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signed shoelace area: positive for counter-clockwise rings.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        if self.0.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for (a, b) in self.edges() {
            sum += a.x.mul_add(b.y, -(b.x * a.y));
        }
        sum / 2.0
    }

    /// Whether the ring winds counter-clockwise.
    #[must_use]
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverse the winding direction in place.
    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    /// Iterate over the ring's edges, including the closing edge from
    /// the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Simplify the ring with a max-deviation tolerance.
    ///
    /// The ring is treated as a closed polyline (first vertex repeated
    /// at the end) so the closure is preserved; rings that would
    /// collapse below 3 vertices are returned unchanged.
    #[must_use]
    pub fn simplified(&self, tolerance: f64) -> Self {
        if self.0.len() < 4 || tolerance <= 0.0 {
            return self.clone();
        }
        let mut closed = self.0.clone();
        closed.push(self.0[0]);
        let reduced = finalize::simplify(&Polyline::new(closed), tolerance);
        let result = Self::new(reduced.into_points());
        if result.len() < 3 { self.clone() } else { result }
    }
}

/// A polygon: one outer ring plus zero or more hole rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    outer: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    /// Create a polygon from raw ring coordinate sequences.
    ///
    /// Orientation is normalized: outer counter-clockwise, holes
    /// clockwise, so signed-area sums treat holes as negative space.
    #[must_use]
    pub fn new(outer: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        let mut outer = Ring::new(outer);
        if !outer.is_ccw() {
            outer.reverse();
        }
        let holes = holes
            .into_iter()
            .map(|ring| {
                let mut ring = Ring::new(ring);
                if ring.is_ccw() {
                    ring.reverse();
                }
                ring
            })
            .collect();
        Self { outer, holes }
    }

    /// The outer ring.
    #[must_use]
    pub const fn outer(&self) -> &Ring {
        &self.outer
    }

    /// The hole rings.
    #[must_use]
    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// All rings: the outer ring first, then holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Total enclosed area: outer area minus hole areas.
    ///
    /// Orientation normalization in [`Polygon::new`] makes the signed
    /// ring areas sum directly.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rings().map(Ring::signed_area).sum()
    }

    /// Area-weighted centroid, holes subtracted.
    ///
    /// Falls back to the outer ring's vertex average when the total
    /// area is effectively zero.
    #[must_use]
    pub fn centroid(&self) -> Point {
        let mut area_sum = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for ring in self.rings() {
            for (a, b) in ring.edges() {
                let cross = a.x.mul_add(b.y, -(b.x * a.y));
                area_sum += cross;
                cx += (a.x + b.x) * cross;
                cy += (a.y + b.y) * cross;
            }
        }
        if area_sum.abs() < f64::EPSILON {
            let pts = self.outer.points();
            if pts.is_empty() {
                return Point::new(0.0, 0.0);
            }
            let n = usize_to_f64(pts.len());
            let (sx, sy) = pts
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
            return Point::new(sx / n, sy / n);
        }
        Point::new(cx / (3.0 * area_sum), cy / (3.0 * area_sum))
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    ///
    /// Returns an empty box at the origin for a vertexless polygon.
    #[must_use]
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let mut iter = self.rings().flat_map(|r| r.points().iter());
        let Some(first) = iter.next() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        let mut bbox = (first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.0 = bbox.0.min(p.x);
            bbox.1 = bbox.1.min(p.y);
            bbox.2 = bbox.2.max(p.x);
            bbox.3 = bbox.3.max(p.y);
        }
        bbox
    }

    /// The longer side of the bounding box.
    #[must_use]
    pub fn extent(&self) -> f64 {
        let (min_x, min_y, max_x, max_y) = self.bounding_box();
        (max_x - min_x).max(max_y - min_y)
    }

    /// Even-odd containment test across all rings.
    ///
    /// A point inside the outer ring but also inside a hole has an even
    /// crossing count for that hole and is reported outside, which is
    /// exactly the occupancy the skeleton raster needs.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for ring in self.rings() {
            for (a, b) in ring.edges() {
                if (a.y > p.y) != (b.y > p.y) {
                    let t = (p.y - a.y) / (b.y - a.y);
                    let x = t.mul_add(b.x - a.x, a.x);
                    if p.x < x {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }

    /// Simplify every ring with a tolerance expressed as a fraction of
    /// the polygon's bounding extent.
    ///
    /// Speeds up skeleton extraction on very dense boundaries at the
    /// cost of fine boundary detail. A `fraction` of zero returns the
    /// polygon unchanged.
    #[must_use]
    pub fn presimplified(&self, fraction: f64) -> Self {
        if fraction <= 0.0 {
            return self.clone();
        }
        let tolerance = fraction * self.extent();
        Self {
            outer: self.outer.simplified(tolerance),
            holes: self.holes.iter().map(|h| h.simplified(tolerance)).collect(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
const fn usize_to_f64(n: usize) -> f64 {
    n as f64
}
