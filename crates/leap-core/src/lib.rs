//! Homeostatic forgetting ink engine.
//!
//! Freehand strokes fade according to a feedback loop: each frame the
//! visible ink is rasterized into a coarse occupancy grid, its mean
//! coverage drives a proportional controller with a dead zone, and the
//! resulting decay rate sets every stroke's alpha from its age in virtual
//! time. Virtual time can be scrubbed backward to resurrect forgotten ink,
//! and drawing from an earlier moment starts a new world line.
//!
//! Zero file I/O. Persistence and settings live in `leap-store`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod decay;
pub mod density;
pub mod error;
pub mod raster;
pub mod serde_compat;
pub mod session;
pub mod smoothing;
pub mod store;
pub mod stroke;
pub mod timeline;

pub use config::{ControllerConfig, DecayConfig, EngineConfig, PenConfig, TimelineConfig};
pub use controller::{HomeostaticController, lambda_factor};
pub use decay::{DecayEngine, DecayReport, alpha_at};
pub use density::{DensityEstimator, Viewport};
pub use error::SnapshotError;
pub use raster::{GridSize, OccupancyGrid, OccupancyRasterizer, Quad, ScanlineRasterizer};
pub use serde_compat::{Snapshot, WireSnapshot, export_json, import_json};
pub use session::{ClockMode, FrameReport, InkSession, RenderItem};
pub use smoothing::{PathCommand, midpoint_path, svg_path_data};
pub use store::StrokeStore;
pub use stroke::{InkPoint, Rgb, Stroke};
pub use timeline::{
    Generation, LaneLayout, PlaybackStep, VirtualTimeline, WorldLineSegment, segments,
};
