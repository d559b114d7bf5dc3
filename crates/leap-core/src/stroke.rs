use serde::{Deserialize, Serialize};

use crate::timeline::Generation;

/// RGB colour, components in whatever range the renderer expects (0..=255 for the defaults).
pub type Rgb = [f64; 3];

pub const BLACK: Rgb = [0.0, 0.0, 0.0];

/// One pointer sample in canvas (viewport pixel) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InkPoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl InkPoint {
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.pressure]
    }
}

/// A committed freehand stroke.
///
/// Geometry, width, colour and creation time are fixed at commit. Only the
/// derived visibility (`visible_alpha` and the retirement marker) changes
/// afterwards, and only the decay engine writes it.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    points: Vec<InkPoint>,
    width: f64,
    color: Rgb,
    creation_time: f64,
    visible_alpha: f64,
    retired_in: Option<Generation>,
}

impl Stroke {
    pub fn new(points: Vec<InkPoint>, width: f64, color: Rgb, creation_time: f64) -> Self {
        Self {
            points,
            width,
            color,
            creation_time,
            visible_alpha: 1.0,
            retired_in: None,
        }
    }

    /// Same stroke with a restored alpha (snapshot import).
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.visible_alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn points(&self) -> &[InkPoint] {
        &self.points
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn creation_time(&self) -> f64 {
        self.creation_time
    }

    pub fn visible_alpha(&self) -> f64 {
        self.visible_alpha
    }

    /// Age at virtual time `now`. Negative when the stroke does not exist yet.
    pub fn age(&self, now: f64) -> f64 {
        now - self.creation_time
    }

    /// Whether the stroke has at least one segment to rasterize.
    pub fn has_segments(&self) -> bool {
        self.points.len() >= 2
    }

    /// Retired strokes skip decay and rasterization until the generation moves on.
    pub fn is_retired(&self, generation: Generation) -> bool {
        self.retired_in == Some(generation)
    }

    pub(crate) fn set_alpha(&mut self, alpha: f64) {
        self.visible_alpha = alpha;
    }

    pub(crate) fn retire(&mut self, generation: Generation) {
        self.visible_alpha = 0.0;
        self.retired_in = Some(generation);
    }

    /// Drop a stale retirement marker so the stroke is recomputed.
    pub(crate) fn revive(&mut self) {
        self.retired_in = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(t: f64) -> Stroke {
        Stroke::new(
            vec![InkPoint::new(0.0, 0.0, 1.0), InkPoint::new(10.0, 0.0, 1.0)],
            6.0,
            BLACK,
            t,
        )
    }

    #[test]
    fn test_new_stroke_fully_visible() {
        let s = line(2.0);
        assert_eq!(s.visible_alpha(), 1.0);
        assert!(!s.is_retired(Generation::default()));
    }

    #[test]
    fn test_age_negative_before_creation() {
        let s = line(5.0);
        assert_eq!(s.age(3.0), -2.0);
        assert_eq!(s.age(5.0), 0.0);
    }

    #[test]
    fn test_retirement_scoped_to_generation() {
        let mut s = line(0.0);
        let g0 = Generation::default();
        s.retire(g0);
        assert!(s.is_retired(g0));
        assert_eq!(s.visible_alpha(), 0.0);
        assert!(!s.is_retired(g0.next()));
    }

    #[test]
    fn test_with_alpha_clamps() {
        assert_eq!(line(0.0).with_alpha(1.7).visible_alpha(), 1.0);
        assert_eq!(line(0.0).with_alpha(-0.2).visible_alpha(), 0.0);
    }

    #[test]
    fn test_point_array_roundtrip() {
        let p = InkPoint::new(1.5, 2.5, 0.75);
        assert_eq!(InkPoint::from_array(p.to_array()), p);
    }
}
