//! Virtual time and world lines.
//!
//! Virtual time only moves backward through an explicit [`VirtualTimeline::seek`]
//! (scrub, import, jump-to-now, branch pad). Every backward move bumps the
//! [`Generation`], which is what invalidates stroke retirement. Forward
//! motion from drawing or playback never touches the generation.

use std::ops::Range;

use tracing::debug;

use crate::config::TimelineConfig;

/// Rewind counter. Cached per-stroke retirement is valid only for the
/// generation it was recorded in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Outcome of one playback tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackStep {
    Continue,
    /// Playback reached `max_virtual_time` and was clamped to it.
    ReachedNow,
}

#[derive(Clone, Debug, Default)]
pub struct VirtualTimeline {
    virtual_time: f64,
    max_virtual_time: f64,
    generation: Generation,
}

impl VirtualTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn virtual_time(&self) -> f64 {
        self.virtual_time
    }

    /// "Now": the frontier of committed ink.
    pub fn max_virtual_time(&self) -> f64 {
        self.max_virtual_time
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Move forward by `dt`. Non-positive or non-finite steps are ignored.
    pub fn advance(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.virtual_time += dt;
        }
    }

    /// Set the time absolutely. Returns `true` if this was a rewind.
    pub fn seek(&mut self, t: f64) -> bool {
        if !t.is_finite() {
            return false;
        }
        let t = t.max(0.0);
        let rewound = t < self.virtual_time;
        if rewound {
            self.invalidate();
            debug!(
                from = self.virtual_time,
                to = t,
                generation = self.generation.value(),
                "virtual time rewound"
            );
        }
        self.virtual_time = t;
        rewound
    }

    /// Seek to `fraction` of a slider spanning `span` virtual seconds.
    pub fn seek_fraction(&mut self, fraction: f64, span: f64) -> bool {
        if !fraction.is_finite() {
            return false;
        }
        self.seek(fraction.clamp(0.0, 1.0) * span)
    }

    /// Jump to the frontier of committed ink.
    pub fn jump_to_now(&mut self) -> bool {
        self.seek(self.max_virtual_time)
    }

    /// Record a stroke commit at `t`, pushing the frontier if it is beyond it.
    pub fn note_commit(&mut self, t: f64) {
        if t > self.max_virtual_time {
            self.max_virtual_time = t;
        }
    }

    /// One playback tick: advance by `dt`, stopping at the frontier.
    pub fn step_playback(&mut self, dt: f64) -> PlaybackStep {
        let t = self.virtual_time + dt.max(0.0);
        if t >= self.max_virtual_time {
            self.seek(self.max_virtual_time);
            PlaybackStep::ReachedNow
        } else {
            self.virtual_time = t;
            PlaybackStep::Continue
        }
    }

    /// Force every cached retirement stale.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.next();
    }

    pub fn clear(&mut self) {
        self.virtual_time = 0.0;
        self.max_virtual_time = 0.0;
        self.invalidate();
    }

    /// Replace time state from a snapshot. The restored time may sit past
    /// the frontier, as it can after a forward scrub.
    pub fn restore(&mut self, virtual_time: f64, max_virtual_time: f64) {
        self.virtual_time = virtual_time;
        self.max_virtual_time = max_virtual_time;
        self.invalidate();
    }
}

/// A maximal run of strokes (in commit order) with non-decreasing creation times.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldLineSegment {
    /// Position of the segment in display order, also its lane on the pad.
    pub lane: usize,
    pub indices: Range<usize>,
    pub first_time: f64,
    pub last_time: f64,
}

impl WorldLineSegment {
    pub fn contains(&self, stroke_index: usize) -> bool {
        self.indices.contains(&stroke_index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Partition creation times into world lines.
///
/// A time strictly smaller than its predecessor starts a new segment; equal
/// times continue the current one.
pub fn segments(times: &[f64]) -> Vec<WorldLineSegment> {
    let mut out = Vec::new();
    let Some(&first) = times.first() else {
        return out;
    };

    let mut start = 0;
    let mut start_time = first;
    let mut prev = first;
    for (i, &t) in times.iter().enumerate().skip(1) {
        if t < prev {
            out.push(WorldLineSegment {
                lane: out.len(),
                indices: start..i,
                first_time: start_time,
                last_time: prev,
            });
            start = i;
            start_time = t;
        }
        prev = t;
    }
    out.push(WorldLineSegment {
        lane: out.len(),
        indices: start..times.len(),
        first_time: start_time,
        last_time: prev,
    });
    out
}

/// The world line a stroke belongs to.
pub fn segment_of(
    segments: &[WorldLineSegment],
    stroke_index: usize,
) -> Option<&WorldLineSegment> {
    segments.iter().find(|s| s.contains(stroke_index))
}

/// Geometry of the timeline pad: one horizontal lane per world line, time on x.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneLayout {
    pub lane_height: f64,
    pub lane_gap: f64,
    pub span: f64,
}

impl LaneLayout {
    pub fn from_config(cfg: &TimelineConfig) -> Self {
        Self {
            lane_height: cfg.lane_height,
            lane_gap: cfg.lane_gap,
            span: cfg.span,
        }
    }

    /// Top edge of a lane.
    pub fn lane_y(&self, lane: usize) -> f64 {
        lane as f64 * (self.lane_height + self.lane_gap)
    }

    /// Lane whose centre line is within one lane height of `y`. First match wins.
    pub fn hit_test(&self, segments: &[WorldLineSegment], y: f64) -> Option<usize> {
        let centre = |lane| self.lane_y(lane) + self.lane_height / 2.0;
        segments
            .iter()
            .find(|s| (y - centre(s.lane)).abs() < self.lane_height)
            .map(|s| s.lane)
    }

    /// Virtual time under pad x-coordinate `x` on a pad `width` wide.
    pub fn time_at(&self, x: f64, width: f64) -> f64 {
        if width <= 0.0 || !x.is_finite() {
            return 0.0;
        }
        (x / width).clamp(0.0, 1.0) * self.span
    }

    /// Pad x-coordinate for virtual time `t`.
    pub fn x_at(&self, t: f64, width: f64) -> f64 {
        if self.span <= 0.0 {
            return 0.0;
        }
        t / self.span * width
    }
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self::from_config(&TimelineConfig::default())
    }
}
