//! Momentum-SGD update kernels
//!
//! This module provides the in-place weight update rules used by the
//! optimizer. The momentum form matches the classic heavy-ball update with
//! weight decay folded into the momentum term:
//!
//! ```text
//! state  = momentum * state + lr * rescale_grad * clip(grad) + lr * wd * weight
//! weight = weight - state
//! ```
//!
//! The stateless form is plain SGD and is used when no momentum buffer exists
//! for a parameter; the tuner is skipped entirely on that path.

/// Rescale and optionally clip a single gradient element.
///
/// Clipping is applied after rescaling, symmetrically to
/// `[-clip_gradient, clip_gradient]`.
#[inline]
fn effective_grad(g: f32, rescale_grad: f32, clip_gradient: Option<f32>) -> f32 {
    let g = g * rescale_grad;
    match clip_gradient {
        Some(limit) => g.clamp(-limit, limit),
        None => g,
    }
}

/// Momentum-SGD update with weight decay, in place.
///
/// Applies, element-wise:
///
/// ```text
/// buffer[i] = momentum * buffer[i] + lr * g[i] + lr * wd * weight[i]
/// weight[i] = weight[i] - buffer[i]
/// ```
///
/// where `g[i]` is the rescaled (and optionally clipped) gradient element.
///
/// # Arguments
///
/// * `weight` - Parameters to update, mutated in place
/// * `grad` - Gradient of the loss with respect to `weight`
/// * `momentum_buffer` - Accumulated update state, mutated in place
/// * `lr` - Learning rate for this step
/// * `wd` - Weight decay (L2 penalty) coefficient
/// * `momentum` - Momentum coefficient for this step
/// * `rescale_grad` - Multiplier applied to the raw gradient (e.g. 1/batch)
/// * `clip_gradient` - Optional symmetric clipping bound, applied after rescaling
///
/// # Examples
///
/// ```
/// use yellowfin::update::sgd_mom_update;
///
/// let mut weight = vec![1.0, 1.0];
/// let grad = vec![0.1, 0.1];
/// let mut buffer = vec![0.0, 0.0];
///
/// sgd_mom_update(&mut weight, &grad, &mut buffer, 0.1, 0.0, 0.0, 1.0, None);
/// assert!((buffer[0] - 0.01).abs() < 1e-7);
/// assert!((weight[0] - 0.99).abs() < 1e-7);
/// ```
pub fn sgd_mom_update(
    weight: &mut [f32],
    grad: &[f32],
    momentum_buffer: &mut [f32],
    lr: f32,
    wd: f32,
    momentum: f32,
    rescale_grad: f32,
    clip_gradient: Option<f32>,
) {
    debug_assert_eq!(weight.len(), grad.len());
    debug_assert_eq!(weight.len(), momentum_buffer.len());

    for ((w, &g), m) in weight
        .iter_mut()
        .zip(grad.iter())
        .zip(momentum_buffer.iter_mut())
    {
        let g = effective_grad(g, rescale_grad, clip_gradient);
        *m = momentum * *m + lr * g + lr * wd * *w;
        *w -= *m;
    }
}

/// Plain SGD update with weight decay, in place.
///
/// Fallback for parameters without a momentum buffer:
///
/// ```text
/// weight[i] = weight[i] - lr * g[i] - lr * wd * weight[i]
/// ```
///
/// # Examples
///
/// ```
/// use yellowfin::update::sgd_update;
///
/// let mut weight = vec![1.0];
/// sgd_update(&mut weight, &[0.5], 0.1, 0.0, 1.0, None);
/// assert!((weight[0] - 0.95).abs() < 1e-7);
/// ```
pub fn sgd_update(
    weight: &mut [f32],
    grad: &[f32],
    lr: f32,
    wd: f32,
    rescale_grad: f32,
    clip_gradient: Option<f32>,
) {
    debug_assert_eq!(weight.len(), grad.len());

    for (w, &g) in weight.iter_mut().zip(grad.iter()) {
        let g = effective_grad(g, rescale_grad, clip_gradient);
        *w -= lr * g + lr * wd * *w;
    }
}
