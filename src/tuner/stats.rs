//! Per-step gradient statistics
//!
//! The stat tracker feeds the closed-form solve with three per-step
//! estimates, each maintained as an exponential moving average
//! (`x = beta*x + (1-beta)*sample`):
//!
//! 1. curvature range `(h_min, h_max)` from a sliding window of squared
//!    gradient norms
//! 2. gradient variance `C` from element-wise averages of the gradient
//! 3. distance to the optimum `D` from norm and squared-norm averages
//!
//! All three formulas are kept verbatim from the reference implementation,
//! including two documented quirks (see `observe_variance` and
//! `zero_debias_factor`). None of these operations fail under finite input;
//! a NaN/Inf gradient propagates silently into the averages.

use crate::tuner::GlobalTuningState;

/// L2 norm of a gradient, accumulated in f64.
pub(crate) fn l2_norm(grad: &[f32]) -> f64 {
    grad.iter()
        .map(|&g| {
            let g = g as f64;
            g * g
        })
        .sum::<f64>()
        .sqrt()
}

/// Curvature, variance and distance estimators.
///
/// Holds only the smoothing configuration; the mutable statistics live in
/// `GlobalTuningState`, which is passed in explicitly so the cross-parameter
/// sharing of that state stays visible at every call site.
#[derive(Debug, Clone)]
pub struct StatTracker {
    beta: f64,
    zero_bias: bool,
}

impl StatTracker {
    /// Creates a tracker with the given smoothing factor.
    ///
    /// # Arguments
    ///
    /// * `beta` - EMA smoothing factor in (0, 1), typically 0.999
    /// * `zero_bias` - When true (the default), `zero_debias_factor` is a
    ///   constant `1.0`, i.e. cold-start bias correction is OFF. The flag
    ///   name is inverted relative to its effect; the behavior is preserved
    ///   verbatim from the reference.
    pub fn new(beta: f64, zero_bias: bool) -> Self {
        Self { beta, zero_bias }
    }

    /// Update the curvature window and return the smoothed curvature range.
    ///
    /// Writes `||grad||^2` into the window slot `step_count mod W`, then
    /// blends the min and max over the valid window prefix into the
    /// `h_min`/`h_max` averages. At step 0 the window holds exactly one
    /// valid entry, so both bounds equal that entry scaled by `(1 - beta)`.
    ///
    /// `h_min <= h_max` holds by construction: both averages blend the
    /// extrema of the same slice with the same factor.
    pub fn observe_curvature(&self, state: &mut GlobalTuningState, grad: &[f32]) -> (f64, f64) {
        let beta = self.beta;
        let width = state.curvature_window.len();
        let norm = l2_norm(grad);

        let slot = (state.step_count as usize) % width;
        state.curvature_window[slot] = norm * norm;

        let valid_end = width.min(state.step_count as usize + 1);
        let valid = &state.curvature_window[..valid_end];
        // valid_end >= 1 always, so min/max over the slice are defined
        let win_min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let win_max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        state.h_min = beta * state.h_min + (1.0 - beta) * win_min;
        state.h_max = beta * state.h_max + (1.0 - beta) * win_max;
        (state.h_min, state.h_max)
    }

    /// Update the element-wise gradient averages and return the variance
    /// estimate `C`.
    ///
    /// In place, element-wise:
    ///
    /// ```text
    /// grad_avg         = beta * grad_avg         + (1 - beta) * grad
    /// grad_avg_squared = beta * grad_avg_squared + (1 - beta) * grad * grad
    /// ```
    ///
    /// then returns
    ///
    /// ```text
    /// sum(grad_avg * grad_avg) / -(debias^2) + ||grad|| / debias
    /// ```
    ///
    /// This is the reference formula verbatim, NOT a textbook variance:
    /// `grad_avg_squared` is updated but unused in the return value, and the
    /// sign structure is as written. Downstream numerics depend on it, so it
    /// is preserved rather than corrected.
    pub fn observe_variance(
        &self,
        state: &GlobalTuningState,
        grad: &[f32],
        grad_avg: &mut [f32],
        grad_avg_squared: &mut [f32],
    ) -> f64 {
        let beta = self.beta as f32;

        for ((avg, sq), &g) in grad_avg
            .iter_mut()
            .zip(grad_avg_squared.iter_mut())
            .zip(grad.iter())
        {
            *avg = beta * *avg + (1.0 - beta) * g;
            *sq = beta * *sq + (1.0 - beta) * g * g;
        }

        let debias = self.zero_debias_factor(state);
        let sum_avg_sq: f64 = grad_avg
            .iter()
            .map(|&a| {
                let a = a as f64;
                a * a
            })
            .sum();
        sum_avg_sq / -(debias * debias) + l2_norm(grad) / debias
    }

    /// Update the distance-to-optimum averages and return the debiased
    /// estimate `D`.
    pub fn observe_distance(&self, state: &mut GlobalTuningState, grad: &[f32]) -> f64 {
        let beta = self.beta;
        let norm = l2_norm(grad);

        state.grad_norm_avg = beta * state.grad_norm_avg + (1.0 - beta) * norm;
        state.h_avg = beta * state.h_avg + (1.0 - beta) * norm * norm;
        state.dist_to_opt_avg = beta * state.dist_to_opt_avg
            + (1.0 - beta) * state.grad_norm_avg / state.h_avg;

        state.dist_to_opt_avg / self.zero_debias_factor(state)
    }

    /// Cold-start correction factor for the moving averages.
    ///
    /// Returns exactly `1.0` whenever `zero_bias` is true (the default), so
    /// bias correction is effectively disabled out of the box; otherwise
    /// `1 - beta^(step_count + 1)`. Preserved verbatim, naming inversion
    /// included.
    pub fn zero_debias_factor(&self, state: &GlobalTuningState) -> f64 {
        if self.zero_bias {
            return 1.0;
        }
        1.0 - self.beta.powi(state.step_count as i32 + 1)
    }
}
