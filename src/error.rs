//! Error types for the tuning core
//!
//! All tuning failures are fatal to the current step: the training loop must
//! halt or skip the step. The optimizer never substitutes a default value for
//! a failed tuning computation, since a silently injected fallback would
//! corrupt the moving-average trajectory without any visible symptom.
//!
//! NaN/Inf gradients are deliberately NOT detected here. They propagate into
//! the moving averages and eventually surface as `NumericalInstability` on a
//! later step.

use thiserror::Error;

/// Errors produced by the tuning core.
///
/// # Variants
///
/// * `InvalidConfig` - a configuration field is out of range; reported at
///   construction, before any state exists
/// * `DegenerateCurvature` - the lower curvature bound is zero (or negative),
///   so the learning-rate formula `(1 - sqrt(mu))^2 / h_min` is undefined
/// * `NumericalInstability` - the cubic root filter produced zero or multiple
///   candidates, or the gradient-variance estimate was non-positive
/// * `ShapeMismatch` - weight, gradient and per-parameter state lengths
///   disagree; checked at the `update` call boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum YellowFinError {
    /// A configuration field is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Lower curvature bound is zero or negative; division undefined.
    #[error("degenerate curvature estimate: h_min = {0}")]
    DegenerateCurvature(f64),

    /// The closed-form solve cannot produce a unique answer.
    #[error("numerically unstable tuning solve: {0}")]
    NumericalInstability(String),

    /// Weight, gradient and state buffers must all have the same length.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Length of the weight buffer for this parameter index.
        expected: usize,
        /// Length of the disagreeing buffer.
        actual: usize,
    },
}

/// Convenience result alias for tuning operations.
pub type Result<T> = std::result::Result<T, YellowFinError>;
