//! Self-tuning momentum-SGD optimizer
//!
//! This library implements a YellowFin-style optimizer: plain momentum SGD
//! whose momentum coefficient and learning rate are re-derived every step
//! from statistics of the observed gradients (curvature range, gradient
//! variance, distance to the optimum) via a closed-form cubic solve.
//!
//! The surrounding training loop (model, data, autodiff) is the caller's
//! business; the crate only needs weights and gradients as flat `f32`
//! slices.
//!
//! # Modules
//!
//! - `optimizer`: the optimizer itself (per-step update protocol)
//! - `tuner`: gradient statistics and the momentum/learning-rate solve
//! - `update`: in-place momentum-SGD update kernels
//! - `config`: JSON configuration loading and validation
//! - `error`: the tuning error taxonomy

pub mod config;
pub mod error;
pub mod optimizer;
pub mod tuner;
pub mod update;

pub use config::YellowFinConfig;
pub use error::YellowFinError;
pub use optimizer::{ParameterState, YellowFin};
