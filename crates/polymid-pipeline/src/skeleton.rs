//! Skeleton extraction: polygon boundary to a topological skeleton graph.
//!
//! Uses the discretized route: the polygon is scanline-rasterized into a
//! binary occupancy mask (even-odd rule, so holes rasterize as holes) at
//! a working resolution, the mask is reduced to a unit-width skeleton by
//! Zhang-Suen thinning, and the surviving cells become a graph with
//! exact boundary distances queried from the [`BoundaryField`].
//!
//! Zhang-Suen preserves connectivity, so a polygon with holes yields
//! skeleton cycles around them that stay attached to the main skeleton.
//! Path selection needs that full topology to pick the dominant spine.

use image::GrayImage;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::distance::BoundaryField;
use crate::polygon::Polygon;
use crate::types::{PipelineError, Point};

/// Area below this fraction of extent squared is considered zero.
const AREA_EPSILON: f64 = 1e-12;

/// Occupied cell value in the raster mask.
const FILLED: u8 = 255;

/// A skeleton graph node: a point inside the polygon tagged with its
/// distance to the nearest boundary feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonNode {
    /// Node position (raster cell center in map coordinates).
    pub point: Point,
    /// Exact distance to the nearest polygon boundary edge.
    pub boundary_dist: f64,
}

/// The full topological skeleton of a polygon.
///
/// Arena-indexed undirected graph: nodes own their geometry, edges
/// carry their Euclidean length. May contain cycles (one around each
/// hole); for a simple polygon without holes it is a tree.
#[derive(Debug, Clone)]
pub struct SkeletonGraph {
    graph: UnGraph<SkeletonNode, f64>,
}

impl SkeletonGraph {
    /// Wrap a hand-built graph (unit tests only).
    #[cfg(test)]
    pub(crate) const fn from_graph(graph: UnGraph<SkeletonNode, f64>) -> Self {
        Self { graph }
    }

    /// The underlying graph.
    #[must_use]
    pub const fn graph(&self) -> &UnGraph<SkeletonNode, f64> {
        &self.graph
    }

    /// Number of skeleton nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Degree-1 nodes, in ascending index order (deterministic).
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph.neighbors(n).count() == 1)
            .collect()
    }

    /// All edges as point pairs, for diagnostic output.
    #[must_use]
    pub fn segments(&self) -> Vec<(Point, Point)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((self.graph[a].point, self.graph[b].point))
            })
            .collect()
    }
}

/// Raster frame: maps grid cells to map coordinates.
///
/// One cell of padding on every side so thinning never touches the
/// image border.
struct Grid {
    min_x: f64,
    min_y: f64,
    cell: f64,
    width: u32,
    height: u32,
}

impl Grid {
    fn new(polygon: &Polygon, working_resolution: u32) -> Self {
        let (min_x, min_y, max_x, max_y) = polygon.bounding_box();
        let extent = (max_x - min_x).max(max_y - min_y);
        let cell = extent / f64::from(working_resolution);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cols = ((max_x - min_x) / cell).ceil() as u32 + 1;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rows = ((max_y - min_y) / cell).ceil() as u32 + 1;
        Self {
            min_x: cell.mul_add(-1.0, min_x),
            min_y: cell.mul_add(-1.0, min_y),
            cell,
            width: cols + 2,
            height: rows + 2,
        }
    }

    /// Map coordinates of a cell center.
    fn center(&self, col: u32, row: u32) -> Point {
        Point::new(
            (f64::from(col) + 0.5).mul_add(self.cell, self.min_x),
            (f64::from(row) + 0.5).mul_add(self.cell, self.min_y),
        )
    }
}

/// Compute the skeleton graph of a polygon.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] when the polygon has
/// effectively zero area, a self-intersecting boundary, or is too thin
/// to occupy any raster cell at the working resolution.
pub fn build(
    polygon: &Polygon,
    field: &BoundaryField,
    working_resolution: u32,
) -> Result<SkeletonGraph, PipelineError> {
    let extent = polygon.extent();
    if extent <= 0.0 {
        return Err(PipelineError::DegenerateGeometry(
            "polygon has zero extent".to_owned(),
        ));
    }
    if polygon.area() <= AREA_EPSILON * extent * extent {
        return Err(PipelineError::DegenerateGeometry(
            "polygon area is effectively zero".to_owned(),
        ));
    }
    if let Some(p) = field.self_intersection() {
        return Err(PipelineError::DegenerateGeometry(format!(
            "boundary self-intersects near ({:.6}, {:.6})",
            p.x, p.y
        )));
    }

    let grid = Grid::new(polygon, working_resolution);
    let mask = rasterize(polygon, &grid);
    if mask.pixels().all(|p| p.0[0] != FILLED) {
        return Err(PipelineError::DegenerateGeometry(
            "polygon interior is thinner than the raster resolution".to_owned(),
        ));
    }

    let skeleton = thin(mask);
    Ok(build_graph(&skeleton, &grid, field))
}

/// Scanline rasterization with the even-odd rule.
///
/// For each row of cell centers, the crossings of all ring edges are
/// collected and sorted; cells between consecutive crossing pairs are
/// filled. Holes contribute their own crossings and therefore empty
/// their interior, matching [`Polygon::contains`].
fn rasterize(polygon: &Polygon, grid: &Grid) -> GrayImage {
    let mut mask = GrayImage::new(grid.width, grid.height);
    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..grid.height {
        let y = grid.center(0, row).y;
        crossings.clear();
        for ring in polygon.rings() {
            for (a, b) in ring.edges() {
                if (a.y > y) != (b.y > y) {
                    let t = (y - a.y) / (b.y - a.y);
                    crossings.push(t.mul_add(b.x - a.x, a.x));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let (x0, x1) = (pair[0], pair[1]);
            for col in 0..grid.width {
                let x = grid.center(col, row).x;
                if x >= x0 && x < x1 {
                    mask.put_pixel(col, row, image::Luma([FILLED]));
                }
            }
        }
    }
    mask
}

/// Zhang-Suen thinning: iteratively peel boundary cells until only a
/// unit-width, connectivity-preserving skeleton remains.
fn thin(mut mask: GrayImage) -> GrayImage {
    let mut to_clear: Vec<(u32, u32)> = Vec::new();
    loop {
        let mut changed = false;
        for pass in 0..2 {
            to_clear.clear();
            for row in 1..mask.height() - 1 {
                for col in 1..mask.width() - 1 {
                    if mask.get_pixel(col, row).0[0] == FILLED
                        && should_peel(&mask, col, row, pass == 0)
                    {
                        to_clear.push((col, row));
                    }
                }
            }
            if !to_clear.is_empty() {
                changed = true;
                for &(col, row) in &to_clear {
                    mask.put_pixel(col, row, image::Luma([0]));
                }
            }
        }
        if !changed {
            return mask;
        }
    }
}

/// Zhang-Suen peel condition for one cell.
///
/// Neighbors p2..p9 run clockwise from north. A cell is peeled when it
/// has 2..=6 filled neighbors, exactly one 0→1 transition around the
/// ring, and the pass-specific corner products are zero.
fn should_peel(mask: &GrayImage, col: u32, row: u32, first_pass: bool) -> bool {
    let at = |dc: i64, dr: i64| -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (c, r) = ((i64::from(col) + dc) as u32, (i64::from(row) + dr) as u32);
        u8::from(mask.get_pixel(c, r).0[0] == FILLED)
    };
    // p2 p3 p4 p5 p6 p7 p8 p9 clockwise from north.
    let p = [
        at(0, -1),
        at(1, -1),
        at(1, 0),
        at(1, 1),
        at(0, 1),
        at(-1, 1),
        at(-1, 0),
        at(-1, -1),
    ];

    let filled: u8 = p.iter().sum();
    if !(2..=6).contains(&filled) {
        return false;
    }

    let transitions = (0..8).filter(|&i| p[i] == 0 && p[(i + 1) % 8] == 1).count();
    if transitions != 1 {
        return false;
    }

    let (c1, c2) = if first_pass {
        (p[0] * p[2] * p[4], p[2] * p[4] * p[6])
    } else {
        (p[0] * p[2] * p[6], p[0] * p[4] * p[6])
    };
    c1 == 0 && c2 == 0
}

/// Convert skeleton cells to an arena graph.
///
/// Cells are visited in row-major order, so node indices (and therefore
/// downstream tie-breaks) are deterministic. Each cell connects to its
/// east/south/south-east/south-west skeleton neighbors; a diagonal is
/// skipped when either of its flanking orthogonal cells is also set,
/// which avoids redundant triangles without breaking connectivity.
fn build_graph(skeleton: &GrayImage, grid: &Grid, field: &BoundaryField) -> SkeletonGraph {
    let set = |col: i64, row: i64| -> bool {
        if col < 0 || row < 0 {
            return false;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (c, r) = (col as u32, row as u32);
        c < skeleton.width() && r < skeleton.height() && skeleton.get_pixel(c, r).0[0] == FILLED
    };

    let mut graph = UnGraph::new_undirected();
    let mut index_of = vec![None; (skeleton.width() * skeleton.height()) as usize];
    let cell_index = |col: u32, row: u32| (row * skeleton.width() + col) as usize;

    for row in 0..skeleton.height() {
        for col in 0..skeleton.width() {
            if skeleton.get_pixel(col, row).0[0] != FILLED {
                continue;
            }
            let point = grid.center(col, row);
            let node = graph.add_node(SkeletonNode {
                point,
                boundary_dist: field.distance(point),
            });
            index_of[cell_index(col, row)] = Some(node);
        }
    }

    let orthogonal = grid.cell;
    let diagonal = grid.cell * std::f64::consts::SQRT_2;
    for row in 0..skeleton.height() {
        for col in 0..skeleton.width() {
            let Some(node) = index_of[cell_index(col, row)] else {
                continue;
            };
            let (c, r) = (i64::from(col), i64::from(row));

            let mut connect = |dc: i64, dr: i64, weight: f64| {
                if set(c + dc, r + dr) {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let neighbor = index_of[cell_index((c + dc) as u32, (r + dr) as u32)];
                    if let Some(neighbor) = neighbor {
                        graph.add_edge(node, neighbor, weight);
                    }
                }
            };

            // East and south cover all orthogonal adjacency once.
            connect(1, 0, orthogonal);
            connect(0, 1, orthogonal);
            // Diagonals only where no orthogonal two-step exists.
            if !set(c + 1, r) && !set(c, r + 1) {
                connect(1, 1, diagonal);
            }
            if !set(c - 1, r) && !set(c, r + 1) {
                connect(-1, 1, diagonal);
            }
        }
    }

    SkeletonGraph { graph }
}
