//! Engine tunables. Every section defaults to the stock constants and
//! deserializes with missing fields filled in, so a partial settings file
//! only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_LAMBDA, DRAW_FLOOR, FACTOR_MAX, FACTOR_MIN, GAIN_K, HYSTERESIS, LANE_GAP, LANE_HEIGHT,
    PEN_WIDTH, RETIRE_FLOOR, TARGET_DENSITY, TICK_PERIOD_MS, TICK_SECS, TIMELINE_SPAN,
};
use crate::raster::GridSize;
use crate::stroke::{BLACK, Rgb};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub target_density: f64,
    pub hysteresis: f64,
    pub gain: f64,
    pub factor_min: f64,
    pub factor_max: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target_density: TARGET_DENSITY,
            hysteresis: HYSTERESIS,
            gain: GAIN_K,
            factor_min: FACTOR_MIN,
            factor_max: FACTOR_MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub base_lambda: f64,
    pub retire_floor: f64,
    pub draw_floor: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            base_lambda: BASE_LAMBDA,
            retire_floor: RETIRE_FLOOR,
            draw_floor: DRAW_FLOOR,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Virtual seconds per clock tick.
    pub tick_secs: f64,
    /// Wall-clock tick period for real-time drivers.
    pub tick_period_ms: u64,
    /// Virtual seconds spanned by the scrub slider.
    pub span: f64,
    pub lane_height: f64,
    pub lane_gap: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tick_secs: TICK_SECS,
            tick_period_ms: TICK_PERIOD_MS,
            span: TIMELINE_SPAN,
            lane_height: LANE_HEIGHT,
            lane_gap: LANE_GAP,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenConfig {
    pub width: f64,
    pub color: Rgb,
}

impl Default for PenConfig {
    fn default() -> Self {
        Self {
            width: PEN_WIDTH,
            color: BLACK,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub controller: ControllerConfig,
    pub decay: DecayConfig,
    pub density: GridSize,
    pub timeline: TimelineConfig,
    pub pen: PenConfig,
}

impl EngineConfig {
    /// Pull user-supplied values back into their valid ranges.
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn sanitized(self) -> Self {
        let d = EngineConfig::default();
        let c = self.controller;
        let (lo, hi) = {
            let lo = finite_or(c.factor_min, d.controller.factor_min).max(0.0);
            let hi = finite_or(c.factor_max, d.controller.factor_max).max(0.0);
            if lo <= hi { (lo, hi) } else { (hi, lo) }
        };
        let controller = ControllerConfig {
            target_density: finite_or(c.target_density, d.controller.target_density)
                .clamp(0.0, 1.0),
            hysteresis: finite_or(c.hysteresis, d.controller.hysteresis).max(0.0),
            gain: finite_or(c.gain, d.controller.gain).max(0.0),
            factor_min: lo,
            factor_max: hi,
        };

        let decay = DecayConfig {
            base_lambda: finite_or(self.decay.base_lambda, d.decay.base_lambda).max(0.0),
            retire_floor: finite_or(self.decay.retire_floor, d.decay.retire_floor)
                .clamp(0.0, 1.0),
            draw_floor: finite_or(self.decay.draw_floor, d.decay.draw_floor).clamp(0.0, 1.0),
        };

        let density = GridSize {
            width: self.density.width.max(1),
            height: self.density.height.max(1),
        };

        let t = self.timeline;
        let positive = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        let timeline = TimelineConfig {
            tick_secs: positive(t.tick_secs, d.timeline.tick_secs),
            tick_period_ms: t.tick_period_ms.max(1),
            span: positive(t.span, d.timeline.span),
            lane_height: positive(t.lane_height, d.timeline.lane_height),
            lane_gap: finite_or(t.lane_gap, d.timeline.lane_gap).max(0.0),
        };

        let pen = PenConfig {
            width: positive(self.pen.width, d.pen.width),
            color: self.pen.color,
        };

        Self {
            controller,
            decay,
            density,
            timeline,
            pen,
        }
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}
