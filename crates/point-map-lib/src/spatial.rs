//! Uniform grid spatial index over point coordinates
//!
//! The grid is built once per dataset and never mutated. Queries return candidate
//! indices from every cell touched by the query shape; they over-approximate and the
//! caller refines with an exact distance or containment test.

use crate::Point;
use crate::config::CellSizePolicy;
use geo::{Coord, Rect};
use smallvec::SmallVec;

/// Upper bound on grid cells; a finer cell size is coarsened until it fits
const MAX_CELLS: usize = 1 << 20;

/// Cell size used when the policy yields nothing usable (single point, NaN, ...)
const FALLBACK_CELL_SIZE: f64 = 1.0;

/// Candidate list returned by radius queries; picking rarely touches more than a few
pub type Candidates = SmallVec<[usize; 16]>;

/// Read-only uniform grid mapping cells to point indices
///
/// Storage is a packed bucket layout: `entries[offsets[c]..offsets[c + 1]]` holds the
/// point indices of cell `c = cy * cols + cx`. Every point index appears in exactly one
/// cell.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    origin: Coord<f64>,
    cell_size: f64,
    cols: usize,
    rows: usize,
    offsets: Vec<u32>,
    entries: Vec<u32>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialIndex {
    /// Build the grid for `points`
    ///
    /// Never fails: an empty slice gives an index that answers every query with
    /// nothing, and a zero-extent dataset gets a positive fallback cell size.
    pub fn build(points: &[Point], policy: CellSizePolicy) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("spatial::build");

        let Some((min, max)) = coordinate_bounds(points) else {
            return Self {
                origin: Coord { x: 0.0, y: 0.0 },
                cell_size: match policy {
                    CellSizePolicy::Fixed(size) if size.is_finite() && size > 0.0 => size,
                    _ => FALLBACK_CELL_SIZE,
                },
                cols: 0,
                rows: 0,
                offsets: vec![0],
                entries: Vec::new(),
            };
        };

        let extent_x = max.x - min.x;
        let extent_y = max.y - min.y;
        let mut cell_size = resolve_cell_size(policy, extent_x.max(extent_y));
        let (mut cols, mut rows) = grid_dims(extent_x, extent_y, cell_size);
        if cols * rows > MAX_CELLS as f64 {
            let requested = cell_size;
            while cols * rows > MAX_CELLS as f64 && cell_size.is_finite() {
                cell_size *= 2.0;
                (cols, rows) = grid_dims(extent_x, extent_y, cell_size);
            }
            tracing::warn!(requested, cell_size, "Cell size coarsened to bound the grid");
        }
        let cols = clamp_dim(cols);
        let rows = clamp_dim(rows);

        let mut index = Self {
            origin: min,
            cell_size,
            cols,
            rows,
            offsets: vec![0; cols * rows + 1],
            entries: vec![0; points.len()],
        };

        // Pass 1: count points per cell (shifted by one for the prefix sum)
        for point in points {
            let cell = index.cell_of(point.x, point.y);
            index.offsets[cell + 1] += 1;
        }

        // Prefix sum -> bucket start offsets
        for c in 0..cols * rows {
            index.offsets[c + 1] += index.offsets[c];
        }

        // Pass 2: scatter, using a cursor per cell
        let mut cursor: Vec<u32> = index.offsets[..cols * rows].to_vec();
        for (i, point) in points.iter().enumerate() {
            let cell = index.cell_of(point.x, point.y);
            index.entries[cursor[cell] as usize] = i as u32;
            cursor[cell] += 1;
        }

        tracing::debug!(
            points = points.len(),
            cell_size,
            cols,
            rows,
            "Spatial index built"
        );

        index
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// Grid dimensions as (columns, rows)
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Number of indexed points
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidate indices for points within `radius` of (x, y)
    ///
    /// Returns every point in the cells overlapped by the query square, without
    /// deduplication or distance filtering. The result is a superset of the exact
    /// answer; callers must refine it.
    pub fn query_radius(&self, x: f64, y: f64, radius: f64) -> Candidates {
        let mut out = Candidates::new();
        let radius = radius.abs();
        if let Some(cells) = self.cell_range(x - radius, y - radius, x + radius, y + radius) {
            self.collect_cells(cells, &mut out);
        }
        out
    }

    /// Candidate indices for points inside `rect` (boundary cells included)
    pub fn query_rect(&self, rect: Rect<f64>) -> Vec<usize> {
        let mut out = Vec::new();
        let (min, max) = (rect.min(), rect.max());
        if let Some(cells) = self.cell_range(min.x, min.y, max.x, max.y) {
            self.collect_cells(cells, &mut out);
        }
        out
    }

    /// Number of grid cells a radius query at (x, y) would visit
    pub fn cells_visited(&self, x: f64, y: f64, radius: f64) -> usize {
        let radius = radius.abs();
        self.cell_range(x - radius, y - radius, x + radius, y + radius)
            .map(|(cx0, cy0, cx1, cy1)| (cx1 - cx0 + 1) * (cy1 - cy0 + 1))
            .unwrap_or(0)
    }

    /// Flat cell index of a coordinate, clamped into the grid
    #[inline]
    fn cell_of(&self, x: f64, y: f64) -> usize {
        let cx = self.axis_cell(x - self.origin.x).clamp(0, self.cols as i64 - 1) as usize;
        let cy = self.axis_cell(y - self.origin.y).clamp(0, self.rows as i64 - 1) as usize;
        cy * self.cols + cx
    }

    #[inline]
    fn axis_cell(&self, offset: f64) -> i64 {
        (offset / self.cell_size).floor() as i64
    }

    /// Inclusive cell rectangle (cx0, cy0, cx1, cy1) covering a world box, clipped to
    /// the grid. `None` if the box misses the grid entirely.
    fn cell_range(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Option<(usize, usize, usize, usize)> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }

        let cx0 = self.axis_cell(min_x - self.origin.x);
        let cy0 = self.axis_cell(min_y - self.origin.y);
        let cx1 = self.axis_cell(max_x - self.origin.x);
        let cy1 = self.axis_cell(max_y - self.origin.y);

        let last_col = self.cols as i64 - 1;
        let last_row = self.rows as i64 - 1;
        if cx1 < 0 || cy1 < 0 || cx0 > last_col || cy0 > last_row {
            return None;
        }

        Some((
            cx0.max(0) as usize,
            cy0.max(0) as usize,
            cx1.min(last_col) as usize,
            cy1.min(last_row) as usize,
        ))
    }

    /// Append the contents of every cell in the inclusive range, row by row
    fn collect_cells(
        &self,
        (cx0, cy0, cx1, cy1): (usize, usize, usize, usize),
        out: &mut impl Extend<usize>,
    ) {
        for cy in cy0..=cy1 {
            let row = cy * self.cols;
            // Cells of one row are contiguous in `entries`
            let start = self.offsets[row + cx0] as usize;
            let end = self.offsets[row + cx1 + 1] as usize;
            out.extend(self.entries[start..end].iter().map(|&i| i as usize));
        }
    }
}

fn coordinate_bounds(points: &[Point]) -> Option<(Coord<f64>, Coord<f64>)> {
    if points.is_empty() {
        return None;
    }
    let mut min = Coord {
        x: f64::INFINITY,
        y: f64::INFINITY,
    };
    let mut max = Coord {
        x: f64::NEG_INFINITY,
        y: f64::NEG_INFINITY,
    };
    for point in points {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
        tracing::warn!("Dataset has no finite coordinates, indexing at the origin");
        let origin = Coord { x: 0.0, y: 0.0 };
        return Some((origin, origin));
    }
    Some((min, max))
}

fn resolve_cell_size(policy: CellSizePolicy, extent: f64) -> f64 {
    let size = match policy {
        CellSizePolicy::Fixed(size) => size,
        CellSizePolicy::TargetResolution(resolution) => extent / resolution.max(1) as f64,
    };
    if size.is_finite() && size > 0.0 {
        size
    } else {
        tracing::warn!(?policy, extent, "Unusable cell size, using fallback");
        FALLBACK_CELL_SIZE
    }
}

/// Cells per axis, kept in floating point so huge ratios can't overflow
#[inline]
fn grid_dims(extent_x: f64, extent_y: f64, cell_size: f64) -> (f64, f64) {
    (
        (extent_x / cell_size).floor() + 1.0,
        (extent_y / cell_size).floor() + 1.0,
    )
}

/// At least one cell and at most `MAX_CELLS` per axis; NaN becomes 1
#[inline]
fn clamp_dim(cells: f64) -> usize {
    cells.max(1.0).min(MAX_CELLS as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Point::new(i as u32, x, y, 0, 1.0))
            .collect()
    }

    #[test]
    fn test_radius_query_finds_nearest() {
        let pts = points(&[(0.0, 0.0), (10.0, 0.0), (100.0, 100.0)]);
        let index = SpatialIndex::build(&pts, CellSizePolicy::Fixed(5.0));

        let candidates = index.query_radius(0.0, 0.0, 3.0);
        assert!(candidates.contains(&0));

        let nearest = candidates
            .iter()
            .copied()
            .map(|i| (i, (pts[i].x.powi(2) + pts[i].y.powi(2)).sqrt()))
            .filter(|&(_, d)| d <= 3.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        assert_eq!(nearest, Some(0));
    }

    #[test]
    fn test_every_point_in_exactly_one_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let pts: Vec<Point> = (0..500)
            .map(|i| {
                Point::new(i, rng.gen_range(0.0..50.0), rng.gen_range(0.0..30.0), 0, 1.0)
            })
            .collect();
        let index = SpatialIndex::build(&pts, CellSizePolicy::TargetResolution(16));

        let mut all = index.query_rect(Rect::new(
            Coord { x: -1.0, y: -1.0 },
            Coord { x: 51.0, y: 31.0 },
        ));
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
        assert_eq!(index.len(), 500);
    }

    #[test]
    fn test_radius_query_is_superset() {
        let mut rng = StdRng::seed_from_u64(42);
        let pts: Vec<Point> = (0..2000)
            .map(|i| {
                Point::new(i, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0), 0, 1.0)
            })
            .collect();
        let index = SpatialIndex::build(&pts, CellSizePolicy::TargetResolution(32));

        for _ in 0..200 {
            let qx = rng.gen_range(-10.0..110.0);
            let qy = rng.gen_range(-10.0..110.0);
            let r = rng.gen_range(0.0..15.0);
            let candidates = index.query_radius(qx, qy, r);
            for (i, p) in pts.iter().enumerate() {
                let d = ((p.x - qx).powi(2) + (p.y - qy).powi(2)).sqrt();
                if d <= r {
                    assert!(
                        candidates.contains(&i),
                        "point {i} at distance {d} missing for query ({qx}, {qy}, {r})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_cells_visited_independent_of_point_count() {
        let mut rng = StdRng::seed_from_u64(3);
        let small: Vec<Point> = (0..100)
            .map(|i| {
                Point::new(i, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0), 0, 1.0)
            })
            .collect();
        let large: Vec<Point> = (0..20_000)
            .map(|i| {
                Point::new(i, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0), 0, 1.0)
            })
            .collect();

        let a = SpatialIndex::build(&small, CellSizePolicy::Fixed(2.0));
        let b = SpatialIndex::build(&large, CellSizePolicy::Fixed(2.0));

        let r: f64 = 3.0;
        let bound = ((2.0 * r / 2.0).ceil() as usize + 1).pow(2);
        for index in [&a, &b] {
            for &(qx, qy) in &[(50.0, 50.0), (0.5, 99.5), (13.3, 71.9)] {
                assert!(index.cells_visited(qx, qy, r) <= bound);
            }
        }
    }

    #[test]
    fn test_empty_dataset() {
        let index = SpatialIndex::build(&[], CellSizePolicy::TargetResolution(64));
        assert!(index.is_empty());
        assert!(index.query_radius(0.0, 0.0, 100.0).is_empty());
        assert!(
            index
                .query_rect(Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }))
                .is_empty()
        );
        assert_eq!(index.cells_visited(0.0, 0.0, 1.0), 0);
    }

    #[test]
    fn test_degenerate_extent_is_clamped() {
        let pts = points(&[(3.0, 3.0), (3.0, 3.0), (3.0, 3.0)]);
        let index = SpatialIndex::build(&pts, CellSizePolicy::TargetResolution(64));
        assert!(index.cell_size() > 0.0);
        assert_eq!(index.dimensions(), (1, 1));
        assert_eq!(index.query_radius(3.0, 3.0, 0.0).len(), 3);
    }

    #[test]
    fn test_query_outside_grid() {
        let pts = points(&[(0.0, 0.0), (10.0, 10.0)]);
        let index = SpatialIndex::build(&pts, CellSizePolicy::Fixed(1.0));
        assert!(index.query_radius(500.0, 500.0, 2.0).is_empty());
        assert!(index.query_radius(f64::NAN, 0.0, 2.0).is_empty());
    }

    #[test]
    fn test_vanishing_fixed_cell_does_not_overflow() {
        let pts = points(&[(0.0, 0.0), (10_000.0, 0.0)]);
        let index = SpatialIndex::build(&pts, CellSizePolicy::Fixed(1e-16));
        let (cols, rows) = index.dimensions();
        assert!(cols >= 1 && rows >= 1);
        assert!(cols * rows <= MAX_CELLS);
        assert!(index.query_radius(10_000.0, 0.0, 1.0).contains(&1));
        assert!(index.query_radius(0.0, 0.0, 1.0).contains(&0));
    }

    #[test]
    fn test_tiny_fixed_cell_is_coarsened() {
        let pts = points(&[(0.0, 0.0), (1.0e6, 1.0e6)]);
        let index = SpatialIndex::build(&pts, CellSizePolicy::Fixed(1e-3));
        let (cols, rows) = index.dimensions();
        assert!(cols * rows <= MAX_CELLS);
        assert!(index.query_radius(1.0e6, 1.0e6, 1.0).contains(&1));
    }
}
