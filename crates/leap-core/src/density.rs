//! Ink density estimation: strokes → quads → coarse coverage grid → mean.

use crate::constants::MIN_SEGMENT_LEN;
use crate::raster::{
    GridSize, OccupancyGrid, OccupancyRasterizer, Quad, ScanlineRasterizer, Vec2,
};
use crate::stroke::{InkPoint, Stroke};
use crate::timeline::Generation;

/// Size of the on-screen canvas in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        !(usable(self.width) && usable(self.height))
    }
}

/// Widen one segment into a quad in grid coordinates.
///
/// The half-width offset runs along the left-hand normal `(-dy, dx)` in
/// canvas pixels and is scaled to the grid per axis with the points.
/// Returns `None` for segments too short to have a direction.
pub fn segment_quad(
    p0: InkPoint,
    p1: InkPoint,
    half_width: f64,
    viewport: Viewport,
    grid: GridSize,
) -> Option<Quad> {
    let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
    let len = dx.hypot(dy);
    if len.is_nan() || len < MIN_SEGMENT_LEN {
        return None;
    }
    let (nx, ny) = (-dy / len, dx / len);
    let (ox, oy) = (nx * half_width, ny * half_width);

    let sx = grid.width as f64 / viewport.width;
    let sy = grid.height as f64 / viewport.height;
    let to_grid = |x: f64, y: f64| Vec2::new(x * sx, y * sy);

    Some(Quad::new([
        to_grid(p0.x + ox, p0.y + oy),
        to_grid(p1.x + ox, p1.y + oy),
        to_grid(p0.x - ox, p0.y - oy),
        to_grid(p1.x - ox, p1.y - oy),
    ]))
}

/// Cheap pre-filter: does the stroke contribute ink at `now`?
pub fn contributes(stroke: &Stroke, now: f64, generation: Generation) -> bool {
    stroke.creation_time() <= now && stroke.has_segments() && !stroke.is_retired(generation)
}

/// All quads for strokes that pass [`contributes`].
pub fn collect_quads(
    strokes: &[Stroke],
    now: f64,
    generation: Generation,
    viewport: Viewport,
    grid: GridSize,
) -> Vec<Quad> {
    let mut quads = Vec::new();
    if viewport.is_empty() {
        return quads;
    }
    for stroke in strokes.iter().filter(|s| contributes(s, now, generation)) {
        let half = stroke.width() / 2.0;
        quads.extend(
            stroke
                .points()
                .windows(2)
                .filter_map(|w| segment_quad(w[0], w[1], half, viewport, grid)),
        );
    }
    quads
}

/// Converts the visible stroke set into a scalar density in [0, 1].
#[derive(Clone, Debug)]
pub struct DensityEstimator<R = ScanlineRasterizer> {
    grid: GridSize,
    rasterizer: R,
}

impl DensityEstimator<ScanlineRasterizer> {
    pub fn with_grid(grid: GridSize) -> Self {
        Self::new(grid, ScanlineRasterizer::default())
    }
}

impl Default for DensityEstimator<ScanlineRasterizer> {
    fn default() -> Self {
        Self::with_grid(GridSize::default())
    }
}

impl<R: OccupancyRasterizer> DensityEstimator<R> {
    pub fn new(grid: GridSize, rasterizer: R) -> Self {
        Self { grid, rasterizer }
    }

    pub fn grid_size(&self) -> GridSize {
        self.grid
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Rasterize the contributing strokes. `None` when nothing contributes.
    pub fn occupancy(
        &mut self,
        strokes: &[Stroke],
        now: f64,
        generation: Generation,
        viewport: Viewport,
    ) -> Option<OccupancyGrid> {
        let quads = collect_quads(strokes, now, generation, viewport, self.grid);
        if quads.is_empty() {
            return None;
        }
        Some(self.rasterizer.rasterize(&quads, self.grid))
    }

    /// Mean clamped coverage; 0 when no stroke contributes.
    pub fn estimate(
        &mut self,
        strokes: &[Stroke],
        now: f64,
        generation: Generation,
        viewport: Viewport,
    ) -> f64 {
        self.occupancy(strokes, now, generation, viewport)
            .map(|grid| grid.mean_occupancy())
            .unwrap_or(0.0)
    }
}
