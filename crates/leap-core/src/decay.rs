use crate::config::DecayConfig;
use crate::stroke::Stroke;
use crate::timeline::Generation;

/// Visibility of ink `age` virtual seconds old under decay rate `lambda`.
pub fn alpha_at(age: f64, lambda: f64) -> f64 {
    (-lambda * age).exp()
}

/// Per-frame decay counts, for logging and the frame report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecayReport {
    /// Strokes whose alpha was recomputed from their age.
    pub live: usize,
    /// Strokes not yet created at this virtual time.
    pub pending: usize,
    /// Strokes retired in this generation, including `newly_retired`.
    pub retired: usize,
    /// Strokes that crossed the retirement floor this frame.
    pub newly_retired: usize,
    /// Live strokes at or above the draw floor.
    pub drawable: usize,
}

#[derive(Clone, Debug)]
pub struct DecayEngine {
    config: DecayConfig,
    last_time: Option<f64>,
}

impl DecayEngine {
    pub fn new(config: DecayConfig) -> Self {
        Self {
            config,
            last_time: None,
        }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// `base_lambda * lambda_factor`.
    pub fn effective_lambda(&self, lambda_factor: f64) -> f64 {
        self.config.base_lambda * lambda_factor
    }

    /// Record this frame's time. Returns `true` when it is behind the
    /// previous frame's, which callers treat as a rewind.
    ///
    /// [`VirtualTimeline::seek`](crate::VirtualTimeline::seek) already bumps
    /// the generation on every backward move, so inside a session this never
    /// fires. It guards callers that feed [`apply`](Self::apply) frame times
    /// from their own clock.
    pub fn observe(&mut self, now: f64) -> bool {
        let went_back = self.last_time.is_some_and(|prev| now < prev);
        self.last_time = Some(now);
        went_back
    }

    /// Forget the previous frame's time (after clear or import).
    pub fn reset(&mut self) {
        self.last_time = None;
    }

    /// Recompute alpha for every stroke not retired in `generation`.
    ///
    /// Strokes from a later virtual time get alpha 0 but stay eligible.
    /// Strokes decaying below the retirement floor are zeroed and retired
    /// until the generation changes.
    pub fn apply(
        &self,
        strokes: &mut [Stroke],
        now: f64,
        generation: Generation,
        lambda_factor: f64,
    ) -> DecayReport {
        let lambda = self.effective_lambda(lambda_factor);
        let mut report = DecayReport::default();

        for stroke in strokes.iter_mut() {
            if stroke.is_retired(generation) {
                report.retired += 1;
                continue;
            }
            stroke.revive();

            let age = stroke.age(now);
            if age < 0.0 {
                stroke.set_alpha(0.0);
                report.pending += 1;
                continue;
            }

            let alpha = alpha_at(age, lambda);
            if alpha < self.config.retire_floor {
                stroke.retire(generation);
                report.retired += 1;
                report.newly_retired += 1;
                continue;
            }

            stroke.set_alpha(alpha);
            report.live += 1;
            if alpha >= self.config.draw_floor {
                report.drawable += 1;
            }
        }

        report
    }

    /// Whether a stroke is opaque enough to draw.
    pub fn is_drawable(&self, stroke: &Stroke) -> bool {
        stroke.visible_alpha() >= self.config.draw_floor
    }
}

impl Default for DecayEngine {
    fn default() -> Self {
        Self::new(DecayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{BLACK, InkPoint};

    fn stroke_at(t: f64) -> Stroke {
        Stroke::new(
            vec![InkPoint::new(0.0, 0.0, 1.0), InkPoint::new(5.0, 5.0, 1.0)],
            6.0,
            BLACK,
            t,
        )
    }

    #[test]
    fn test_age_zero_is_fully_visible() {
        let engine = DecayEngine::default();
        let mut strokes = vec![stroke_at(3.0)];
        engine.apply(&mut strokes, 3.0, Generation::default(), 4.0);
        assert_eq!(strokes[0].visible_alpha(), 1.0);
    }

    #[test]
    fn test_exponential_decay() {
        let engine = DecayEngine::default();
        let mut strokes = vec![stroke_at(0.0)];
        engine.apply(&mut strokes, 10.0, Generation::default(), 1.0);
        let expected = (-0.1f64 * 10.0).exp();
        assert!((strokes[0].visible_alpha() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_future_stroke_hidden_not_retired() {
        let engine = DecayEngine::default();
        let g = Generation::default();
        let mut strokes = vec![stroke_at(5.0)];
        let report = engine.apply(&mut strokes, 2.0, g, 1.0);
        assert_eq!(strokes[0].visible_alpha(), 0.0);
        assert!(!strokes[0].is_retired(g));
        assert_eq!(report.pending, 1);
    }

    #[test]
    fn test_retires_below_floor() {
        let engine = DecayEngine::default();
        let g = Generation::default();
        let mut strokes = vec![stroke_at(0.0)];
        // exp(-0.1 * 100) ~ 4.5e-5 < 0.001
        let report = engine.apply(&mut strokes, 100.0, g, 1.0);
        assert!(strokes[0].is_retired(g));
        assert_eq!(strokes[0].visible_alpha(), 0.0);
        assert_eq!(report.newly_retired, 1);

        // Retired strokes are skipped, even if time says otherwise.
        let report = engine.apply(&mut strokes, 0.0, g, 1.0);
        assert_eq!(strokes[0].visible_alpha(), 0.0);
        assert_eq!(report.newly_retired, 0);
        assert_eq!(report.retired, 1);
    }

    #[test]
    fn test_new_generation_resurrects() {
        let engine = DecayEngine::default();
        let g = Generation::default();
        let mut strokes = vec![stroke_at(0.0)];
        engine.apply(&mut strokes, 100.0, g, 1.0);
        assert!(strokes[0].is_retired(g));

        let g2 = g.next();
        engine.apply(&mut strokes, 0.0, g2, 1.0);
        assert!(!strokes[0].is_retired(g2));
        assert_eq!(strokes[0].visible_alpha(), 1.0);
    }

    #[test]
    fn test_drawable_floor_above_retire_floor() {
        let engine = DecayEngine::default();
        let mut strokes = vec![stroke_at(0.0)];
        // exp(-0.1 * 50) ~ 0.0067: live, but under the draw floor
        let report = engine.apply(&mut strokes, 50.0, Generation::default(), 1.0);
        assert_eq!(report.live, 1);
        assert_eq!(report.drawable, 0);
        assert!(!engine.is_drawable(&strokes[0]));
    }

    #[test]
    fn test_observe_detects_backward_frame() {
        let mut engine = DecayEngine::default();
        assert!(!engine.observe(2.0));
        assert!(!engine.observe(2.0));
        assert!(!engine.observe(3.0));
        assert!(engine.observe(1.0));
        engine.reset();
        assert!(!engine.observe(0.0));
    }
}
