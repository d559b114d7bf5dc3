//! Coarse coverage rasterization.
//!
//! The density pipeline only needs a small, fixed-size coverage buffer, so
//! the rasterizer is a synchronous `(quads, size) -> grid` call. A GPU
//! backend can sit behind [`OccupancyRasterizer`] as long as it blocks
//! until the readback is complete; [`ScanlineRasterizer`] is the in-memory
//! implementation.

use serde::{Deserialize, Serialize};

use crate::constants::{DENSITY_HEIGHT, DENSITY_WIDTH};

/// Resolution of the occupancy buffer in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(DENSITY_WIDTH, DENSITY_HEIGHT)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A stroke segment widened into a rectangle, in grid-cell coordinates.
///
/// Corner order is `[start + n, end + n, start - n, end - n]` where `n` is
/// the half-width offset along the segment's left-hand normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Vec2; 4],
}

impl Quad {
    pub fn new(corners: [Vec2; 4]) -> Self {
        Self { corners }
    }

    /// The two triangles covering the quad, sharing the `end + n`/`start - n` diagonal.
    pub fn triangles(&self) -> [[Vec2; 3]; 2] {
        let [a0, a1, b0, b1] = self.corners;
        [[a0, a1, b0], [a1, b1, b0]]
    }
}

/// Per-cell coverage read back from a rasterization pass.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    size: GridSize,
    cells: Vec<f32>,
}

impl OccupancyGrid {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![0.0; size.cells()],
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.cells.get(y * self.size.width + x).copied()
    }

    /// Source-over blend of `coverage` into a cell: `src + (1 - src) * dst`.
    /// Repeated hits saturate toward 1 instead of summing past it.
    pub fn blend(&mut self, x: usize, y: usize, coverage: f32) {
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let idx = y * self.size.width + x;
        let dst = self.cells[idx];
        self.cells[idx] = coverage + (1.0 - coverage) * dst;
    }

    /// Arithmetic mean of per-cell coverage, each cell clamped to [0, 1].
    pub fn mean_occupancy(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .cells
            .iter()
            .map(|&c| f64::from(c).clamp(0.0, 1.0))
            .sum();
        sum / self.cells.len() as f64
    }
}

/// Turns quads into a coverage grid, synchronously.
pub trait OccupancyRasterizer {
    /// Clear a `size` target, draw every quad, and return the readback.
    fn rasterize(&mut self, quads: &[Quad], size: GridSize) -> OccupancyGrid;
}

/// Cell-centre sampling rasterizer with a tie-breaking fill rule, so the
/// shared diagonal of a quad is owned by exactly one of its triangles.
#[derive(Clone, Debug)]
pub struct ScanlineRasterizer {
    /// Coverage written by one fragment before blending.
    pub coverage: f32,
}

impl Default for ScanlineRasterizer {
    fn default() -> Self {
        Self { coverage: 1.0 }
    }
}

impl OccupancyRasterizer for ScanlineRasterizer {
    fn rasterize(&mut self, quads: &[Quad], size: GridSize) -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(size);
        let coverage = self.coverage.clamp(0.0, 1.0);
        for quad in quads {
            for tri in quad.triangles() {
                fill_triangle(&mut grid, tri, coverage);
            }
        }
        grid
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Inside test for one edge. Points exactly on the edge belong to the
/// triangle whose copy of the edge points "down" (or left when flat); the
/// neighbour sharing the edge traverses it the other way and rejects them.
fn covers(a: Vec2, b: Vec2, p: Vec2) -> bool {
    let e = edge(a, b, p);
    if e != 0.0 {
        return e > 0.0;
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

fn fill_triangle(grid: &mut OccupancyGrid, tri: [Vec2; 3], coverage: f32) {
    let [mut a, mut b, c] = tri;
    let area = edge(a, b, c);
    if !area.is_finite() || area.abs() < f64::EPSILON {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut a, &mut b);
    }

    let size = grid.size();
    let (w, h) = (size.width as f64, size.height as f64);
    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as usize;
    let max_x = a.x.max(b.x).max(c.x).ceil().min(w) as usize;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as usize;
    let max_y = a.y.max(b.y).max(c.y).ceil().min(h) as usize;

    for y in min_y..max_y {
        let py = y as f64 + 0.5;
        for x in min_x..max_x {
            let p = Vec2::new(x as f64 + 0.5, py);
            if covers(a, b, p) && covers(b, c, p) && covers(c, a, p) {
                grid.blend(x, y, coverage);
            }
        }
    }
}
