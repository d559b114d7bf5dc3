/// Mean occupancy the controller steers toward.
pub const TARGET_DENSITY: f64 = 0.05;

/// Dead-zone half width around the target: no correction inside it.
pub const HYSTERESIS: f64 = 0.02;

/// Base decay rate λ₀ (per virtual second) before the homeostatic factor.
pub const BASE_LAMBDA: f64 = 0.1;

/// Proportional gain applied to the density error.
pub const GAIN_K: f64 = 3.0;

/// Lower bound on the decay-rate multiplier.
pub const FACTOR_MIN: f64 = 0.1;

/// Upper bound on the decay-rate multiplier.
pub const FACTOR_MAX: f64 = 4.0;

/// Alpha below which a stroke is retired from per-frame work.
pub const RETIRE_FLOOR: f64 = 0.001;

/// Alpha below which a stroke is not drawn.
pub const DRAW_FLOOR: f64 = 0.01;

/// Occupancy grid width in cells (independent of viewport size).
pub const DENSITY_WIDTH: usize = 128;

/// Occupancy grid height in cells.
pub const DENSITY_HEIGHT: usize = 96;

/// Virtual seconds added per tick of the playback or drawing clock.
pub const TICK_SECS: f64 = 0.033;

/// Wall-clock period of a tick in milliseconds.
pub const TICK_PERIOD_MS: u64 = 33;

/// Virtual seconds covered by the full width of the timeline.
pub const TIMELINE_SPAN: f64 = 300.0;

/// Stroke width in canvas pixels for committed ink.
pub const PEN_WIDTH: f64 = 6.0;

/// Pressure recorded for pointer samples without a pressure axis.
pub const PEN_PRESSURE: f64 = 1.0;

/// World-line lane height on the timeline pad.
pub const LANE_HEIGHT: f64 = 12.0;

/// Vertical gap between world-line lanes.
pub const LANE_GAP: f64 = 2.0;

/// Segments shorter than this produce no quad.
pub const MIN_SEGMENT_LEN: f64 = 1e-6;
