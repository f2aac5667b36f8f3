//! Gradient-statistics tuner
//!
//! This module contains the state and machinery that turn a stream of
//! observed gradients into a momentum coefficient and learning rate:
//!
//! - `GlobalTuningState`: the per-optimizer scalar state (curvature window,
//!   moving averages, the currently active tuned values)
//! - `stats::StatTracker`: per-step curvature, variance and
//!   distance-to-optimum estimators
//! - `solver`: the closed-form single-step momentum/learning-rate solve
//!
//! The tuning state is a single explicit object shared across ALL parameter
//! indices: one global tuning trajectory, driven by whichever gradient was
//! observed last. This mirrors the reference design and is not
//! per-parameter-correct; it is kept for compatibility and made explicit
//! here (rather than ambient) so a per-parameter variant could swap it out.

pub mod solver;
pub mod stats;

pub use stats::StatTracker;

/// Global tuning state, one instance per optimizer.
///
/// Mutated every step by the single-threaded per-step protocol: the stat
/// tracker writes the window and moving averages, the controller writes the
/// blended `momentum_scalar`/`lr_multiplier` and bumps `step_count`.
///
/// # Invariants
///
/// * `curvature_window` has fixed capacity `W` and holds the most recent
///   `min(W, step_count)` valid squared gradient norms
/// * `h_min <= h_max` after any update, by construction: both averages blend
///   the min/max of the same window slice with the same factor
/// * `momentum_scalar` and `lr_multiplier` are only rewritten after a
///   momentum-buffer-bearing update (never on the stateless SGD path)
#[derive(Debug, Clone)]
pub struct GlobalTuningState {
    /// Number of completed update steps, across all parameter indices.
    pub step_count: u64,
    /// Circular buffer of the last `W` squared gradient norms, overwritten
    /// at `step_count mod W`.
    pub curvature_window: Vec<f64>,
    /// Moving average of the window minimum (lower curvature bound).
    pub h_min: f64,
    /// Moving average of the window maximum (upper curvature bound).
    pub h_max: f64,
    /// Moving average of the gradient norm.
    pub grad_norm_avg: f64,
    /// Moving average of the squared gradient norm.
    pub h_avg: f64,
    /// Moving average of `grad_norm_avg / h_avg` (distance to optimum).
    pub dist_to_opt_avg: f64,
    /// Currently active momentum, read by the update engine.
    pub momentum_scalar: f64,
    /// Currently active learning rate, read by the update engine.
    pub lr_multiplier: f64,
}

impl GlobalTuningState {
    /// Creates a fresh tuning state.
    ///
    /// # Arguments
    ///
    /// * `curv_win_width` - Capacity `W` of the curvature window
    /// * `base_lr` - Initial learning rate, active until the first solve
    /// * `momentum` - Initial momentum, active until the first solve
    pub fn new(curv_win_width: usize, base_lr: f64, momentum: f64) -> Self {
        Self {
            step_count: 0,
            curvature_window: vec![0.0; curv_win_width],
            h_min: 0.0,
            h_max: 0.0,
            grad_norm_avg: 0.0,
            h_avg: 0.0,
            dist_to_opt_avg: 0.0,
            momentum_scalar: momentum,
            lr_multiplier: base_lr,
        }
    }

    /// Slice of window entries that hold observed samples.
    ///
    /// Before the window fills (`step_count < W`) only the leading
    /// `step_count` entries are valid; afterwards the whole window is.
    pub fn valid_window(&self) -> &[f64] {
        let valid = (self.step_count as usize).min(self.curvature_window.len());
        &self.curvature_window[..valid]
    }
}
