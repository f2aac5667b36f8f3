//! Self-tuning momentum-SGD optimizer
//!
//! The optimizer updates each parameter with the momentum-SGD rule using the
//! currently active learning rate and momentum, then refreshes the tuning
//! state from the gradient it just consumed. The refreshed values take
//! effect on the NEXT step:
//!
//! 1. read the active `(lr, momentum)` pair
//! 2. apply the momentum-SGD update to the weights
//! 3. observe curvature, variance and distance from this step's gradient,
//!    solve for the new `(mu, lr)`, and blend both into the active values
//!    with the same smoothing factor as the statistics
//! 4. increment the step counter
//!
//! Step 3 only runs on the momentum-buffer path. A parameter updated without
//! state (plain SGD fallback) leaves the tuner untouched.

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::{validate_config, YellowFinConfig};
use crate::error::{Result, YellowFinError};
use crate::tuner::{solver, GlobalTuningState, StatTracker};
use crate::update;

/// Per-parameter optimizer state.
///
/// One instance per optimizable weight tensor, created on the first update
/// call for that index and owned by the optimizer for its lifetime. All
/// three buffers have the weight's shape.
#[derive(Debug, Clone)]
pub struct ParameterState {
    /// Accumulated momentum-SGD update state.
    pub momentum: Vec<f32>,
    /// Element-wise moving average of the raw gradient.
    pub grad_avg: Vec<f32>,
    /// Element-wise moving average of the squared gradient.
    pub grad_avg_squared: Vec<f32>,
}

impl ParameterState {
    /// Creates zero-initialized state for a weight of `len` elements.
    pub fn new(len: usize) -> Self {
        Self {
            momentum: vec![0.0; len],
            grad_avg: vec![0.0; len],
            grad_avg_squared: vec![0.0; len],
        }
    }

    fn len(&self) -> usize {
        self.momentum.len()
    }
}

/// Momentum-SGD optimizer that tunes its own momentum and learning rate.
///
/// Maintains one [`ParameterState`] per parameter index and a single
/// [`GlobalTuningState`] shared across all indices: the tuning trajectory is
/// driven by whichever gradient was observed last, matching the reference
/// design (see `tuner` module docs).
///
/// # Example
///
/// ```
/// use yellowfin::config::YellowFinConfig;
/// use yellowfin::optimizer::YellowFin;
///
/// let mut optimizer = YellowFin::new(YellowFinConfig::with_base_lr(0.01)).unwrap();
/// let mut weight = vec![1.0f32, 1.0];
///
/// for _ in 0..5 {
///     let grad = vec![0.1f32, 0.1];
///     optimizer.update(0, &mut weight, &grad).unwrap();
/// }
/// assert_eq!(optimizer.step_count(), 5);
/// ```
#[derive(Debug)]
pub struct YellowFin {
    config: YellowFinConfig,
    tracker: StatTracker,
    tuning: GlobalTuningState,
    states: HashMap<usize, ParameterState>,
}

impl YellowFin {
    /// Creates an optimizer, validating the configuration first.
    ///
    /// Config fields are public, so a hand-built or mutated config may
    /// bypass `load_config`; validating here keeps out-of-range values
    /// (e.g. an empty curvature window) from ever reaching the update path.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if any field fails [`validate_config`].
    pub fn new(config: YellowFinConfig) -> Result<Self> {
        validate_config(&config)
            .map_err(|err| YellowFinError::InvalidConfig(err.to_string()))?;
        let tracker = StatTracker::new(config.beta, config.zero_bias);
        let tuning =
            GlobalTuningState::new(config.curv_win_width, config.base_lr, config.momentum);
        Ok(Self {
            config,
            tracker,
            tuning,
            states: HashMap::new(),
        })
    }

    /// Allocates the per-parameter state for `index` ahead of time.
    ///
    /// `update` does this lazily on first use; calling it explicitly is only
    /// needed when the caller wants to inspect or pre-own the buffers.
    pub fn create_state(&mut self, index: usize, len: usize) -> &mut ParameterState {
        self.states.entry(index).or_insert_with(|| ParameterState::new(len))
    }

    /// Per-parameter state for `index`, if allocated.
    pub fn state(&self, index: usize) -> Option<&ParameterState> {
        self.states.get(&index)
    }

    /// Number of completed update steps across all parameter indices.
    pub fn step_count(&self) -> u64 {
        self.tuning.step_count
    }

    /// Currently active learning rate.
    pub fn lr_multiplier(&self) -> f64 {
        self.tuning.lr_multiplier
    }

    /// Currently active momentum.
    pub fn momentum_scalar(&self) -> f64 {
        self.tuning.momentum_scalar
    }

    /// Read-only view of the global tuning state.
    pub fn tuning(&self) -> &GlobalTuningState {
        &self.tuning
    }

    /// Drops all parameter state and restarts the tuning trajectory.
    pub fn reset(&mut self) {
        self.states.clear();
        self.tuning = GlobalTuningState::new(
            self.config.curv_win_width,
            self.config.base_lr,
            self.config.momentum,
        );
    }

    /// Updates `weight` in place from `grad`, managing state internally.
    ///
    /// Allocates the [`ParameterState`] for `index` on first call, so this
    /// always takes the momentum-buffer path and refreshes the tuner.
    ///
    /// # Errors
    ///
    /// * `ShapeMismatch` if `grad` (or previously allocated state) disagrees
    ///   with `weight` in length
    /// * `DegenerateCurvature` / `NumericalInstability` from the tuning
    ///   solve; the weight update for this step has already been applied,
    ///   but the active `(lr, momentum)` pair is left unchanged
    pub fn update(&mut self, index: usize, weight: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != weight.len() {
            return Err(YellowFinError::ShapeMismatch {
                expected: weight.len(),
                actual: grad.len(),
            });
        }
        let mut state = match self.states.remove(&index) {
            Some(state) => state,
            None => ParameterState::new(weight.len()),
        };
        let result = self.update_with_state(weight, grad, Some(&mut state));
        self.states.insert(index, state);
        result
    }

    /// Updates `weight` in place with caller-held state.
    ///
    /// This is the full per-step protocol. With `Some(state)` the momentum
    /// rule is applied and the tuner refreshed; with `None` the plain SGD
    /// fallback runs and tuning is skipped entirely. The step counter
    /// advances on both paths.
    pub fn update_with_state(
        &mut self,
        weight: &mut [f32],
        grad: &[f32],
        state: Option<&mut ParameterState>,
    ) -> Result<()> {
        if grad.len() != weight.len() {
            return Err(YellowFinError::ShapeMismatch {
                expected: weight.len(),
                actual: grad.len(),
            });
        }
        if let Some(ref state) = state {
            if state.len() != weight.len() {
                return Err(YellowFinError::ShapeMismatch {
                    expected: weight.len(),
                    actual: state.len(),
                });
            }
        }

        // tuned values from the PREVIOUS step drive this step's update
        let lr = self.tuning.lr_multiplier;
        let momentum = self.tuning.momentum_scalar;
        let wd = self.config.weight_decay as f32;
        let rescale = self.config.rescale_grad as f32;
        let clip = self.config.clip_gradient.map(|c| c as f32);

        match state {
            Some(state) => {
                update::sgd_mom_update(
                    weight,
                    grad,
                    &mut state.momentum,
                    lr as f32,
                    wd,
                    momentum as f32,
                    rescale,
                    clip,
                );

                let (h_min, h_max) = self.tracker.observe_curvature(&mut self.tuning, grad);
                let c = self.tracker.observe_variance(
                    &self.tuning,
                    grad,
                    &mut state.grad_avg,
                    &mut state.grad_avg_squared,
                );
                let d = self.tracker.observe_distance(&mut self.tuning, grad);
                trace!(
                    "step {}: h_min={h_min:.3e} h_max={h_max:.3e} C={c:.3e} D={d:.3e}",
                    self.tuning.step_count
                );

                let (mu_t, lr_t) = solver::solve(c, d, h_min, h_max)?;
                let beta = self.config.beta;
                self.tuning.momentum_scalar = beta * momentum + (1.0 - beta) * mu_t;
                self.tuning.lr_multiplier = beta * lr + (1.0 - beta) * lr_t;
                debug!(
                    "step {}: tuned mu={:.6} lr={:.6e}",
                    self.tuning.step_count, self.tuning.momentum_scalar, self.tuning.lr_multiplier
                );
            }
            None => {
                update::sgd_update(weight, grad, lr as f32, wd, rescale, clip);
            }
        }

        self.tuning.step_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> YellowFinConfig {
        YellowFinConfig::with_base_lr(0.1)
    }

    #[test]
    fn test_new_rejects_out_of_range_config() {
        // a hand-built config skips load_config; construction must still
        // catch it, since an empty window would divide by zero in the tuner
        let mut bad = config();
        bad.curv_win_width = 0;
        let err = YellowFin::new(bad).unwrap_err();
        assert!(matches!(err, YellowFinError::InvalidConfig(_)));

        let mut bad = config();
        bad.beta = 1.5;
        assert!(YellowFin::new(bad).is_err());
    }

    #[test]
    fn test_state_created_on_first_update() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        assert!(optimizer.state(0).is_none());

        let mut weight = vec![1.0f32, 1.0];
        optimizer.update(0, &mut weight, &[0.1, 0.1]).unwrap();

        let state = optimizer.state(0).unwrap();
        assert_eq!(state.momentum.len(), 2);
        assert_eq!(state.grad_avg.len(), 2);
        assert_eq!(state.grad_avg_squared.len(), 2);
    }

    #[test]
    fn test_first_step_uses_base_lr_and_zero_momentum() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut weight = vec![1.0f32, 1.0];

        optimizer.update(0, &mut weight, &[0.1, 0.1]).unwrap();

        // base_lr = 0.1, momentum = 0: weight -= 0.1 * 0.1
        assert!((weight[0] - 0.99).abs() < 1e-6);
        assert!((weight[1] - 0.99).abs() < 1e-6);
        let state = optimizer.state(0).unwrap();
        assert!((state.momentum[0] - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_tuned_values_change_after_first_update() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut weight = vec![1.0f32; 4];

        optimizer.update(0, &mut weight, &[0.1; 4]).unwrap();

        // blended toward the solved values by (1 - beta)
        assert_ne!(optimizer.lr_multiplier(), 0.1);
        assert_ne!(optimizer.momentum_scalar(), 0.0);
        assert_eq!(optimizer.step_count(), 1);
    }

    #[test]
    fn test_stateless_path_skips_tuning() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut weight = vec![1.0f32];

        optimizer
            .update_with_state(&mut weight, &[0.5], None)
            .unwrap();

        // plain SGD applied, tuner untouched, step still counted
        assert!((weight[0] - 0.95).abs() < 1e-6);
        assert_eq!(optimizer.lr_multiplier(), 0.1);
        assert_eq!(optimizer.momentum_scalar(), 0.0);
        assert_eq!(optimizer.step_count(), 1);
        assert_eq!(optimizer.tuning().h_min, 0.0);
    }

    #[test]
    fn test_shape_mismatch_grad() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut weight = vec![1.0f32, 2.0];

        let err = optimizer.update(0, &mut weight, &[0.1]).unwrap_err();
        assert_eq!(
            err,
            YellowFinError::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        );
        // the failed call must not have advanced the step counter
        assert_eq!(optimizer.step_count(), 0);
    }

    #[test]
    fn test_shape_mismatch_stale_state() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        optimizer.create_state(0, 3);

        let mut weight = vec![1.0f32, 2.0];
        let err = optimizer.update(0, &mut weight, &[0.1, 0.1]).unwrap_err();
        assert_eq!(
            err,
            YellowFinError::ShapeMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_zero_gradient_first_step_is_degenerate() {
        // An all-zero first gradient leaves h_min at 0, which the solve must
        // reject rather than divide by.
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut weight = vec![1.0f32, 1.0];

        let err = optimizer.update(0, &mut weight, &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, YellowFinError::DegenerateCurvature(_)));
        // active tuning values stay at their defaults
        assert_eq!(optimizer.lr_multiplier(), 0.1);
        assert_eq!(optimizer.momentum_scalar(), 0.0);
    }

    #[test]
    fn test_independent_parameter_indices_share_tuning() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut w0 = vec![1.0f32; 2];
        let mut w1 = vec![1.0f32; 8];

        optimizer.update(0, &mut w0, &[0.1; 2]).unwrap();
        optimizer.update(1, &mut w1, &[0.2; 8]).unwrap();

        // one global trajectory: both updates advanced the same counter
        assert_eq!(optimizer.step_count(), 2);
        assert!(optimizer.state(0).is_some());
        assert!(optimizer.state(1).is_some());
    }

    #[test]
    fn test_reset_clears_state_and_trajectory() {
        let mut optimizer = YellowFin::new(config()).unwrap();
        let mut weight = vec![1.0f32; 4];
        for _ in 0..3 {
            optimizer.update(0, &mut weight, &[0.1; 4]).unwrap();
        }

        optimizer.reset();

        assert_eq!(optimizer.step_count(), 0);
        assert_eq!(optimizer.lr_multiplier(), 0.1);
        assert_eq!(optimizer.momentum_scalar(), 0.0);
        assert!(optimizer.state(0).is_none());
    }
}
