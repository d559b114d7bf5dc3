//! Homeostatic decay-rate controller.
//!
//! Proportional law with a dead zone: the multiplier depends only on the
//! current density sample and the configuration, never on earlier frames,
//! so a given density sequence always yields the same factor sequence.

use crate::config::ControllerConfig;

/// Decay-rate multiplier for one density sample.
///
/// `error = density - target`; inside the hysteresis band the correction is
/// zero and the factor is exactly 1. Outside it the factor is
/// `1 + gain * error`, clamped to `[factor_min, factor_max]`.
pub fn lambda_factor(density: f64, cfg: &ControllerConfig) -> f64 {
    let error = density - cfg.target_density;
    let correction = if error.abs() < cfg.hysteresis { 0.0 } else { error };
    // max/min rather than clamp: clamp panics on inverted or NaN bounds.
    (1.0 + cfg.gain * correction)
        .max(cfg.factor_min)
        .min(cfg.factor_max)
}

#[derive(Clone, Debug)]
pub struct HomeostaticController {
    config: ControllerConfig,
    lambda_factor: f64,
}

impl HomeostaticController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            lambda_factor: 1.0,
        }
    }

    /// Feed this frame's density and return the new multiplier.
    /// A non-finite sample counts as an empty canvas.
    pub fn update(&mut self, density: f64) -> f64 {
        let density = if density.is_finite() { density } else { 0.0 };
        self.lambda_factor = lambda_factor(density, &self.config);
        self.lambda_factor
    }

    /// Output of the most recent update (1.0 before the first).
    pub fn lambda_factor(&self) -> f64 {
        self.lambda_factor
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn set_target_density(&mut self, target: f64) {
        if target.is_finite() {
            self.config.target_density = target.clamp(0.0, 1.0);
        }
    }
}

impl Default for HomeostaticController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(target: f64, hysteresis: f64, gain: f64) -> ControllerConfig {
        ControllerConfig {
            target_density: target,
            hysteresis,
            gain,
            ..ControllerConfig::default()
        }
    }

    #[test]
    fn test_dead_zone_applies_no_correction() {
        let c = cfg(0.05, 0.02, 3.0);
        assert_eq!(lambda_factor(0.06, &c), 1.0);
        assert_eq!(lambda_factor(0.04, &c), 1.0);
        assert_eq!(lambda_factor(0.05, &c), 1.0);
    }

    #[test]
    fn test_upper_clamp_exact() {
        assert_eq!(lambda_factor(1.0, &cfg(0.0, 0.02, 3.0)), 4.0);
    }

    #[test]
    fn test_lower_clamp_exact() {
        assert_eq!(lambda_factor(0.0, &cfg(1.0, 0.02, 3.0)), 0.1);
    }

    #[test]
    fn test_proportional_outside_band() {
        let f = lambda_factor(0.25, &cfg(0.05, 0.02, 3.0));
        assert!((f - 1.6).abs() < 1e-12, "expected 1 + 3 * 0.2, got {f}");
        let f = lambda_factor(0.0, &cfg(0.05, 0.02, 3.0));
        assert!((f - 0.85).abs() < 1e-12, "expected 1 - 3 * 0.05, got {f}");
    }

    #[test]
    fn test_update_is_memoryless() {
        let mut a = HomeostaticController::default();
        let mut b = HomeostaticController::default();
        let seq = [0.0, 0.3, 0.06, 0.9, 0.01];
        let fa: Vec<f64> = seq.iter().map(|&d| a.update(d)).collect();
        // Same samples in a different history give the same per-sample output.
        b.update(0.9);
        b.update(0.9);
        let fb: Vec<f64> = seq.iter().map(|&d| b.update(d)).collect();
        assert_eq!(fa, fb);
    }

    #[test]
    fn test_nan_density_is_empty_canvas() {
        let mut c = HomeostaticController::default();
        let f = c.update(f64::NAN);
        assert_eq!(f, lambda_factor(0.0, c.config()));
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let c = ControllerConfig {
            factor_min: 4.0,
            factor_max: 0.1,
            ..ControllerConfig::default()
        };
        let f = lambda_factor(0.5, &c);
        assert!(f.is_finite());
    }

    #[test]
    fn test_set_target_clamped() {
        let mut c = HomeostaticController::default();
        c.set_target_density(2.0);
        assert_eq!(c.config().target_density, 1.0);
    }
}
