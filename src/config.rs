//! Configuration for the optimizer
//!
//! This module provides the optimizer configuration structure and JSON
//! loading. All fields except `base_lr` have defaults matching the
//! reference implementation.
//!
//! # Example
//!
//! ```json
//! {
//!   "base_lr": 0.01,
//!   "beta": 0.999,
//!   "curv_win_width": 20,
//!   "weight_decay": 0.0001,
//!   "clip_gradient": 5.0
//! }
//! ```

use serde::Deserialize;
use std::error::Error;
use std::fs;

fn default_beta() -> f64 {
    0.999
}

fn default_curv_win_width() -> usize {
    20
}

fn default_zero_bias() -> bool {
    true
}

fn default_rescale_grad() -> f64 {
    1.0
}

/// Optimizer configuration.
///
/// # Fields
///
/// * `base_lr` - Initial learning rate, active until the first tuning solve
/// * `momentum` - Initial momentum coefficient (default 0.0)
/// * `beta` - Smoothing factor for every moving average AND for blending the
///   tuned values themselves (default 0.999)
/// * `curv_win_width` - Capacity of the curvature window (default 20)
/// * `zero_bias` - When true (default), cold-start bias correction of the
///   moving averages is DISABLED; the flag name is inverted relative to its
///   effect and preserved from the reference (see
///   `StatTracker::zero_debias_factor`)
/// * `weight_decay` - L2 penalty coefficient (default 0.0)
/// * `rescale_grad` - Multiplier applied to raw gradients, e.g. `1/batch`
///   (default 1.0)
/// * `clip_gradient` - Optional symmetric clipping bound applied after
///   rescaling (default none)
#[derive(Debug, Clone, Deserialize)]
pub struct YellowFinConfig {
    /// Initial learning rate.
    pub base_lr: f64,

    /// Initial momentum coefficient.
    #[serde(default)]
    pub momentum: f64,

    /// Moving-average smoothing factor, in (0, 1).
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Curvature window capacity.
    #[serde(default = "default_curv_win_width")]
    pub curv_win_width: usize,

    /// Disables bias correction when true (reference naming, inverted).
    #[serde(default = "default_zero_bias")]
    pub zero_bias: bool,

    /// L2 weight decay coefficient.
    #[serde(default)]
    pub weight_decay: f64,

    /// Gradient rescaling factor.
    #[serde(default = "default_rescale_grad")]
    pub rescale_grad: f64,

    /// Optional symmetric gradient clipping bound.
    #[serde(default)]
    pub clip_gradient: Option<f64>,
}

impl YellowFinConfig {
    /// Configuration with reference defaults and the given base learning rate.
    ///
    /// # Examples
    ///
    /// ```
    /// use yellowfin::config::YellowFinConfig;
    ///
    /// let config = YellowFinConfig::with_base_lr(0.01);
    /// assert_eq!(config.beta, 0.999);
    /// assert_eq!(config.curv_win_width, 20);
    /// assert!(config.zero_bias);
    /// ```
    pub fn with_base_lr(base_lr: f64) -> Self {
        Self {
            base_lr,
            momentum: 0.0,
            beta: default_beta(),
            curv_win_width: default_curv_win_width(),
            zero_bias: default_zero_bias(),
            weight_decay: 0.0,
            rescale_grad: default_rescale_grad(),
            clip_gradient: None,
        }
    }
}

/// Loads an optimizer configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into a [`YellowFinConfig`] and
/// validates the field values.
///
/// # Returns
///
/// `Ok(YellowFinConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid, or a field is out of range.
///
/// # Examples
///
/// ```no_run
/// use yellowfin::config::load_config;
///
/// let cfg = load_config("config/quadratic.json").unwrap();
/// assert!(cfg.base_lr > 0.0);
/// ```
pub fn load_config(path: &str) -> Result<YellowFinConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: YellowFinConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(msg: &str) -> Box<dyn Error> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
}

/// Validates field ranges.
///
/// Rejects configurations the update rule or the tuner cannot work with:
/// non-positive `base_lr`, `beta` outside `(0, 1)`, an empty curvature
/// window, negative decay/rescale factors, and a non-positive clipping
/// bound.
pub fn validate_config(config: &YellowFinConfig) -> Result<(), Box<dyn Error>> {
    if !(config.base_lr > 0.0) {
        return Err(invalid("base_lr must be positive"));
    }
    if !(config.beta > 0.0 && config.beta < 1.0) {
        return Err(invalid("beta must be in (0, 1)"));
    }
    if config.curv_win_width == 0 {
        return Err(invalid("curv_win_width must be at least 1"));
    }
    if !(config.momentum >= 0.0 && config.momentum < 1.0) {
        return Err(invalid("momentum must be in [0, 1)"));
    }
    if config.weight_decay < 0.0 {
        return Err(invalid("weight_decay must be non-negative"));
    }
    if config.rescale_grad < 0.0 {
        return Err(invalid("rescale_grad must be non-negative"));
    }
    if let Some(clip) = config.clip_gradient {
        if !(clip > 0.0) {
            return Err(invalid("clip_gradient must be positive"));
        }
    }
    Ok(())
}
