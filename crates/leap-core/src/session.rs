//! The drawing surface as a headless engine: input intake, clocks, and the
//! per-frame density → controller → decay pipeline.
//!
//! Everything runs on the caller's thread in strict order. The drawing
//! clock and the playback clock are the only writers of forward virtual
//! time and are mutually exclusive through [`ClockMode`].

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::constants::PEN_PRESSURE;
use crate::controller::HomeostaticController;
use crate::decay::{DecayEngine, DecayReport};
use crate::density::{DensityEstimator, Viewport};
use crate::error::SnapshotError;
use crate::raster::{OccupancyRasterizer, ScanlineRasterizer};
use crate::serde_compat::{Snapshot, WireSnapshot, import_json};
use crate::smoothing::{PathCommand, midpoint_path};
use crate::store::StrokeStore;
use crate::stroke::{InkPoint, Rgb};
use crate::timeline::{
    Generation, LaneLayout, PlaybackStep, VirtualTimeline, WorldLineSegment, segments,
};

/// Which clock, if any, advances virtual time on [`InkSession::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    Idle,
    /// Pointer is down: time runs so the stroke lands later than the last one.
    Drawing,
    /// Replaying toward `max_virtual_time`.
    Playing,
}

/// What one frame computed, for the UI and for logging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub virtual_time: f64,
    pub max_virtual_time: f64,
    pub density: f64,
    pub lambda_factor: f64,
    pub effective_lambda: f64,
    /// Retirement was invalidated since the previous frame.
    pub rewound: bool,
    pub decay: DecayReport,
}

/// A stroke ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// Index into the store, `None` for the in-progress stroke.
    pub index: Option<usize>,
    pub path: Vec<PathCommand>,
    pub width: f64,
    pub color: Rgb,
    pub opacity: f64,
    pub highlighted: bool,
}

pub struct InkSession<R = ScanlineRasterizer> {
    config: EngineConfig,
    store: StrokeStore,
    timeline: VirtualTimeline,
    density: DensityEstimator<R>,
    controller: HomeostaticController,
    decay: DecayEngine,
    clock: ClockMode,
    branch_mode: bool,
    highlight: Option<usize>,
    last_generation: Generation,
}

impl InkSession<ScanlineRasterizer> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rasterizer(config, ScanlineRasterizer::default())
    }
}

impl Default for InkSession<ScanlineRasterizer> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<R: OccupancyRasterizer> InkSession<R> {
    pub fn with_rasterizer(config: EngineConfig, rasterizer: R) -> Self {
        Self {
            store: StrokeStore::new(config.pen.clone()),
            timeline: VirtualTimeline::new(),
            density: DensityEstimator::new(config.density, rasterizer),
            controller: HomeostaticController::new(config.controller.clone()),
            decay: DecayEngine::new(config.decay.clone()),
            clock: ClockMode::Idle,
            branch_mode: false,
            highlight: None,
            last_generation: Generation::default(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn timeline(&self) -> &VirtualTimeline {
        &self.timeline
    }

    pub fn controller(&self) -> &HomeostaticController {
        &self.controller
    }

    pub fn clock(&self) -> ClockMode {
        self.clock
    }

    pub fn virtual_time(&self) -> f64 {
        self.timeline.virtual_time()
    }

    pub fn max_virtual_time(&self) -> f64 {
        self.timeline.max_virtual_time()
    }

    // --- Pointer input ---

    /// Start a stroke. Stops playback. Ignored in branch-authoring mode.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        if self.branch_mode {
            return false;
        }
        self.clock = ClockMode::Drawing;
        self.store.begin_stroke(InkPoint::new(x, y, PEN_PRESSURE));
        true
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if self.branch_mode {
            return;
        }
        self.store.extend_stroke(InkPoint::new(x, y, PEN_PRESSURE));
    }

    /// Finish the stroke at the current virtual time. Returns its index if
    /// it had enough samples to keep.
    pub fn pointer_up(&mut self) -> Option<usize> {
        if self.branch_mode {
            return None;
        }
        if self.clock == ClockMode::Drawing {
            self.clock = ClockMode::Idle;
        }
        if !self.store.is_drawing() {
            return None;
        }
        let t = self.timeline.virtual_time();
        let index = self.store.commit_stroke(t)?;
        self.timeline.note_commit(t);
        debug!(index, time = t, "stroke committed");
        Some(index)
    }

    // --- Clocks ---

    /// Advance whichever clock is running by one tick.
    pub fn tick(&mut self) {
        let dt = self.config.timeline.tick_secs;
        match self.clock {
            ClockMode::Idle => {}
            ClockMode::Drawing => self.timeline.advance(dt),
            ClockMode::Playing => {
                if self.timeline.step_playback(dt) == PlaybackStep::ReachedNow {
                    self.clock = ClockMode::Idle;
                    debug!(time = self.timeline.virtual_time(), "playback reached now");
                }
            }
        }
    }

    /// Start playback. Refused while a stroke is being drawn.
    pub fn play(&mut self) -> bool {
        if self.clock == ClockMode::Drawing {
            return false;
        }
        self.clock = ClockMode::Playing;
        true
    }

    pub fn pause(&mut self) {
        if self.clock == ClockMode::Playing {
            self.clock = ClockMode::Idle;
        }
    }

    /// Returns whether playback is running afterwards.
    pub fn toggle_play(&mut self) -> bool {
        if self.clock == ClockMode::Playing {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    // --- Seeking ---

    pub fn seek(&mut self, t: f64) -> bool {
        self.timeline.seek(t)
    }

    pub fn seek_fraction(&mut self, fraction: f64) -> bool {
        self.timeline
            .seek_fraction(fraction, self.config.timeline.span)
    }

    pub fn jump_to_now(&mut self) -> bool {
        self.timeline.jump_to_now()
    }

    pub fn set_target_density(&mut self, target: f64) {
        self.controller.set_target_density(target);
        self.config.controller.target_density = self.controller.config().target_density;
    }

    /// Drop all ink and return to virtual time zero.
    pub fn clear(&mut self) {
        let dropped = self.store.len();
        self.store.clear();
        self.timeline.clear();
        self.decay.reset();
        self.clock = ClockMode::Idle;
        self.highlight = None;
        info!(dropped, "canvas cleared");
    }

    // --- Branch authoring ---

    /// Enter branch-authoring mode. Playback and the drawing clock stop so
    /// the pad is the only thing moving virtual time. A stroke in progress
    /// is dropped.
    pub fn enter_branch_mode(&mut self) {
        self.pause();
        if self.clock == ClockMode::Drawing {
            self.clock = ClockMode::Idle;
        }
        if self.store.is_drawing() {
            debug!(
                samples = self.store.pending_points().len(),
                "pending stroke dropped for branch mode"
            );
            self.store.discard_pending();
        }
        self.branch_mode = true;
    }

    pub fn exit_branch_mode(&mut self) {
        self.branch_mode = false;
        self.highlight = None;
    }

    pub fn is_branch_mode(&self) -> bool {
        self.branch_mode
    }

    /// Pointer over the branch pad: x picks the virtual time, y picks the
    /// world line to highlight. Returns the highlighted lane.
    pub fn branch_scrub(&mut self, x: f64, y: f64, pad_width: f64) -> Option<usize> {
        if !self.branch_mode {
            return None;
        }
        let layout = self.lane_layout();
        self.timeline.seek(layout.time_at(x, pad_width));
        self.highlight = layout.hit_test(&self.segments(), y);
        self.highlight
    }

    /// Highlight the world line under timeline y-coordinate `y`, or none.
    pub fn hover_timeline(&mut self, y: Option<f64>) -> Option<usize> {
        self.highlight = y.and_then(|y| self.lane_layout().hit_test(&self.segments(), y));
        self.highlight
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn lane_layout(&self) -> LaneLayout {
        LaneLayout::from_config(&self.config.timeline)
    }

    /// World lines over the current stroke list.
    pub fn segments(&self) -> Vec<WorldLineSegment> {
        segments(&self.store.creation_times())
    }

    // --- Frame ---

    /// Run one frame: rewind check, density, controller, decay.
    pub fn frame(&mut self, viewport: Viewport) -> FrameReport {
        let now = self.timeline.virtual_time();
        if self.decay.observe(now) {
            self.timeline.invalidate();
        }
        let generation = self.timeline.generation();
        let rewound = generation != self.last_generation;
        self.last_generation = generation;

        let density = self
            .density
            .estimate(self.store.strokes(), now, generation, viewport);
        let lambda_factor = self.controller.update(density);
        let decay = self
            .decay
            .apply(self.store.strokes_mut(), now, generation, lambda_factor);

        debug!(
            now,
            density,
            lambda_factor,
            live = decay.live,
            retired = decay.retired,
            "frame"
        );

        FrameReport {
            virtual_time: now,
            max_virtual_time: self.timeline.max_virtual_time(),
            density,
            lambda_factor,
            effective_lambda: self.decay.effective_lambda(lambda_factor),
            rewound,
            decay,
        }
    }

    /// Strokes to draw this frame, in commit order, followed by the
    /// in-progress stroke at full opacity.
    pub fn render_list(&self) -> Vec<RenderItem> {
        let lit = self
            .highlight
            .and_then(|lane| self.segments().into_iter().find(|s| s.lane == lane));

        let mut items: Vec<RenderItem> = self
            .store
            .strokes()
            .iter()
            .enumerate()
            .filter(|(_, s)| self.decay.is_drawable(s))
            .map(|(i, s)| RenderItem {
                index: Some(i),
                path: midpoint_path(s.points()),
                width: s.width(),
                color: s.color(),
                opacity: s.visible_alpha().clamp(0.0, 1.0),
                highlighted: lit.as_ref().is_some_and(|seg| seg.contains(i)),
            })
            .collect();

        let pending = self.store.pending_points();
        if !pending.is_empty() {
            let pen = self.store.pen();
            items.push(RenderItem {
                index: None,
                path: midpoint_path(pending),
                width: pen.width,
                color: pen.color,
                opacity: 1.0,
                highlighted: false,
            });
        }
        items
    }

    // --- Snapshots ---

    pub fn snapshot(&self) -> WireSnapshot {
        WireSnapshot::from_parts(self.store.strokes(), self.timeline.virtual_time())
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Replace the whole session state from a snapshot document. On error
    /// nothing is changed.
    pub fn import_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot = import_json(json)?;
        self.restore(snapshot);
        Ok(())
    }

    /// Swap in an already-validated snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let count = snapshot.strokes.len();
        self.store.replace(snapshot.strokes);
        self.timeline
            .restore(snapshot.virtual_time, snapshot.max_virtual_time);
        self.decay.reset();
        self.clock = ClockMode::Idle;
        self.highlight = None;
        info!(
            strokes = count,
            virtual_time = snapshot.virtual_time,
            max_virtual_time = snapshot.max_virtual_time,
            "snapshot restored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Viewport = Viewport {
        width: 800.0,
        height: 600.0,
    };

    fn draw(session: &mut InkSession, from: (f64, f64), to: (f64, f64), ticks: usize) -> usize {
        session.pointer_down(from.0, from.1);
        for i in 1..=ticks {
            let f = i as f64 / ticks as f64;
            let (x, y) = (from.0 + (to.0 - from.0) * f, from.1 + (to.1 - from.1) * f);
            session.pointer_move(x, y);
            session.tick();
        }
        session.pointer_up().unwrap()
    }

    #[test]
    fn test_drawing_clock_runs_while_pointer_down() {
        let mut s = InkSession::new(EngineConfig::default());
        let idx = draw(&mut s, (10.0, 10.0), (200.0, 100.0), 10);
        let t = s.store().strokes()[idx].creation_time();
        assert!((t - 0.33).abs() < 1e-9, "ten ticks of 0.033, got {t}");
        assert_eq!(s.max_virtual_time(), t);
        assert_eq!(s.clock(), ClockMode::Idle);
    }

    #[test]
    fn test_pointer_down_stops_playback() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (50.0, 50.0), 5);
        s.seek(0.0);
        assert!(s.play());
        s.pointer_down(1.0, 1.0);
        assert_eq!(s.clock(), ClockMode::Drawing);
        assert!(!s.play());
    }

    #[test]
    fn test_playback_stops_at_now() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (50.0, 50.0), 5);
        let now = s.max_virtual_time();
        s.seek(0.0);
        s.play();
        for _ in 0..100 {
            s.tick();
        }
        assert_eq!(s.clock(), ClockMode::Idle);
        assert_eq!(s.virtual_time(), now);
    }

    #[test]
    fn test_single_click_commits_nothing() {
        let mut s = InkSession::new(EngineConfig::default());
        s.pointer_down(5.0, 5.0);
        s.tick();
        assert_eq!(s.pointer_up(), None);
        assert!(s.store().is_empty());
        assert_eq!(s.max_virtual_time(), 0.0);
        assert_eq!(s.clock(), ClockMode::Idle);
    }

    #[test]
    fn test_frame_reports_density_and_factor() {
        let mut s = InkSession::new(EngineConfig::default());
        let report = s.frame(VIEW);
        assert_eq!(report.density, 0.0);
        assert!((report.lambda_factor - 0.85).abs() < 1e-12);

        draw(&mut s, (0.0, 310.0), (800.0, 310.0), 10);
        let report = s.frame(VIEW);
        assert!(report.density > 0.0 && report.density <= 1.0);
        assert_eq!(report.decay.live, 1);
    }

    #[test]
    fn test_rewind_resurrects_retired_stroke() {
        let mut s = InkSession::new(EngineConfig::default());
        let idx = draw(&mut s, (100.0, 100.0), (300.0, 300.0), 4);
        let created = s.store().strokes()[idx].creation_time();

        s.seek(created + 500.0);
        s.frame(VIEW);
        let g = s.timeline().generation();
        assert!(s.store().strokes()[idx].is_retired(g));
        assert_eq!(s.store().strokes()[idx].visible_alpha(), 0.0);

        assert!(s.seek(created));
        let report = s.frame(VIEW);
        let g = s.timeline().generation();
        assert!(report.rewound);
        assert!(!s.store().strokes()[idx].is_retired(g));
        assert_eq!(s.store().strokes()[idx].visible_alpha(), 1.0);
    }

    #[test]
    fn test_drawing_does_not_invalidate() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        s.frame(VIEW);
        draw(&mut s, (20.0, 20.0), (30.0, 30.0), 3);
        assert!(!s.frame(VIEW).rewound);
    }

    #[test]
    fn test_branch_creates_second_world_line() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        draw(&mut s, (20.0, 0.0), (30.0, 10.0), 3);
        s.seek(0.0);
        draw(&mut s, (40.0, 0.0), (50.0, 10.0), 1);

        let segs = s.segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].indices, 0..2);
        assert_eq!(segs[1].indices, 2..3);
    }

    #[test]
    fn test_branch_mode_scrub_and_highlight() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        s.seek(0.0);
        draw(&mut s, (40.0, 0.0), (50.0, 10.0), 1);

        assert_eq!(s.branch_scrub(100.0, 6.0, 1000.0), None);
        s.enter_branch_mode();
        assert!(!s.pointer_down(5.0, 5.0));

        // second lane's centre is at 14 + 6
        assert_eq!(s.branch_scrub(1.0, 20.0, 1000.0), Some(1));
        assert!((s.virtual_time() - 0.3).abs() < 1e-9);

        s.frame(VIEW);
        let lit: Vec<_> = s
            .render_list()
            .into_iter()
            .filter(|r| r.highlighted)
            .filter_map(|r| r.index)
            .collect();
        assert_eq!(lit, vec![1]);

        s.exit_branch_mode();
        assert_eq!(s.highlight(), None);
    }

    #[test]
    fn test_branch_mode_stops_stroke_in_progress() {
        let mut s = InkSession::new(EngineConfig::default());
        assert!(s.pointer_down(1.0, 1.0));
        s.pointer_move(2.0, 2.0);
        s.enter_branch_mode();
        assert_eq!(s.clock(), ClockMode::Idle);
        assert!(!s.store().is_drawing());

        s.branch_scrub(100.0, 0.0, 1000.0);
        s.tick();
        assert!((s.virtual_time() - 30.0).abs() < 1e-9);

        s.pointer_move(3.0, 3.0);
        assert!(s.store().pending_points().is_empty());
        assert_eq!(s.pointer_up(), None);
        assert!(s.store().is_empty());
    }

    #[test]
    fn test_render_list_skips_faint_and_adds_pending() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        s.seek(60.0);
        s.frame(VIEW);
        assert!(s.render_list().is_empty());

        s.pointer_down(1.0, 1.0);
        s.pointer_move(2.0, 2.0);
        let items = s.render_list();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].index, None);
        assert_eq!(items[0].opacity, 1.0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        s.seek(2.0);
        s.clear();
        assert!(s.store().is_empty());
        assert_eq!(s.virtual_time(), 0.0);
        assert_eq!(s.max_virtual_time(), 0.0);
    }

    #[test]
    fn test_import_failure_leaves_state() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        let before = s.export_json().unwrap();
        assert!(s.import_json(r#"{"strokes": [{"points": "nope"}]}"#).is_err());
        assert_eq!(s.export_json().unwrap(), before);
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut s = InkSession::new(EngineConfig::default());
        draw(&mut s, (0.0, 0.0), (10.0, 10.0), 3);
        draw(&mut s, (5.0, 5.0), (15.0, 25.0), 2);
        s.seek(0.05);
        let json = s.export_json().unwrap();

        let mut restored = InkSession::new(EngineConfig::default());
        restored.import_json(&json).unwrap();
        assert_eq!(restored.virtual_time(), 0.05);
        assert_eq!(restored.max_virtual_time(), s.max_virtual_time());
        assert_eq!(restored.store().strokes(), s.store().strokes());
    }
}
