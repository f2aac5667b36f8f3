//! Closed-form momentum and learning-rate solve
//!
//! Each step the tuner minimizes the expected squared distance to the
//! optimum for a heavy-ball update, which reduces to finding the unique root
//! in `(0, 1)` of the cubic with descending coefficients
//!
//! ```text
//! [-1, 3, p2, 1],    p2 = -(3 + D^2 * h_min^2 / (2 * C))
//! ```
//!
//! where `C` is the gradient variance, `D` the distance to the optimum and
//! `h_min` the lower curvature bound. The momentum is the larger of the
//! squared root and the classical heavy-ball optimum for the curvature ratio
//! `h_max / h_min`; the learning rate follows as `(1 - sqrt(mu))^2 / h_min`.
//!
//! The solve is pure and deterministic: it never touches tuning state, and
//! identical inputs produce bit-identical outputs.

use crate::error::{Result, YellowFinError};

/// Roots with an imaginary magnitude below this are treated as real.
const IMAG_TOL: f64 = 1e-5;

/// All three roots of the monic cubic `x^3 + a*x^2 + b*x + c`, as
/// `(re, im)` pairs.
///
/// Closed form: Cardano for one real root plus a conjugate pair, the
/// trigonometric method for three real roots. A repeated root appears as two
/// (or three) entries with the same real part and zero imaginary part.
pub(crate) fn cubic_roots(a: f64, b: f64, c: f64) -> [(f64, f64); 3] {
    // depress via x = t - a/3: t^3 + p*t + q = 0
    let shift = -a / 3.0;
    let p = b - a * a / 3.0;
    let q = 2.0 * a * a * a / 27.0 - a * b / 3.0 + c;
    let disc = (q / 2.0) * (q / 2.0) + (p / 3.0) * (p / 3.0) * (p / 3.0);

    if disc > 0.0 {
        // one real root and a conjugate pair
        let sq = disc.sqrt();
        let u = (-q / 2.0 + sq).cbrt();
        let v = (-q / 2.0 - sq).cbrt();
        let re = -(u + v) / 2.0 + shift;
        let im = (u - v) * 3.0f64.sqrt() / 2.0;
        [(u + v + shift, 0.0), (re, im), (re, -im)]
    } else {
        // three real roots; disc == 0 degenerates to a repeated root
        let m = 2.0 * (-p / 3.0).sqrt();
        if m == 0.0 {
            // p == 0 and disc <= 0 force q == 0: triple root
            return [(shift, 0.0); 3];
        }
        let arg = (3.0 * q / (p * m)).clamp(-1.0, 1.0);
        let theta = arg.acos() / 3.0;
        let thirds = 2.0 * std::f64::consts::PI / 3.0;
        [
            (m * theta.cos() + shift, 0.0),
            (m * (theta - thirds).cos() + shift, 0.0),
            (m * (theta + thirds).cos() + shift, 0.0),
        ]
    }
}

/// Filter roots to real parts in the open interval `(0, 1)` with negligible
/// imaginary part, and require exactly one survivor.
///
/// Zero or multiple survivors mean the tuning inputs were inconsistent;
/// guessing among candidates would silently corrupt the tuning trajectory,
/// so this is a hard error.
pub(crate) fn unit_interval_root(roots: &[(f64, f64); 3]) -> Result<f64> {
    let mut survivor = None;
    let mut count = 0usize;
    for &(re, im) in roots {
        if re > 0.0 && re < 1.0 && im.abs() < IMAG_TOL {
            survivor = Some(re);
            count += 1;
        }
    }
    match (count, survivor) {
        (1, Some(re)) => Ok(re),
        _ => Err(YellowFinError::NumericalInstability(format!(
            "cubic root filter found {count} candidates in (0, 1), need exactly 1"
        ))),
    }
}

/// Solve for the momentum and learning rate given the current estimates.
///
/// # Arguments
///
/// * `c` - Gradient variance estimate, must be positive
/// * `d` - Distance-to-optimum estimate
/// * `h_min` - Lower curvature bound, must be positive
/// * `h_max` - Upper curvature bound
///
/// # Returns
///
/// `(mu, lr)` where `mu` is the larger of the polynomial-derived momentum
/// and the heavy-ball optimum `((sqrt(dr) - 1) / (sqrt(dr) + 1))^2` for the
/// curvature ratio `dr = h_max / h_min`, and `lr = (1 - sqrt(mu))^2 / h_min`.
///
/// # Errors
///
/// * `DegenerateCurvature` if `h_min <= 0` (division undefined)
/// * `NumericalInstability` if `c <= 0` (cubic coefficient undefined) or the
///   root filter does not find exactly one candidate
///
/// # Examples
///
/// ```
/// use yellowfin::tuner::solver::solve;
///
/// let (mu, lr) = solve(1.0, 1.0, 1.0, 4.0).unwrap();
/// assert!(mu > 0.0 && mu < 1.0);
/// assert!(lr > 0.0);
/// ```
pub fn solve(c: f64, d: f64, h_min: f64, h_max: f64) -> Result<(f64, f64)> {
    if h_min <= 0.0 {
        return Err(YellowFinError::DegenerateCurvature(h_min));
    }
    if !(c > 0.0) {
        return Err(YellowFinError::NumericalInstability(format!(
            "gradient variance C = {c} is not positive"
        )));
    }

    // descending coefficients [-1, 3, p2, 1]; normalized monic form below
    let p2 = -(3.0 + d * d * h_min * h_min / (2.0 * c));
    let roots = cubic_roots(-3.0, -p2, -1.0);
    let root = unit_interval_root(&roots)?;

    let dr = h_max / h_min;
    let heavy_ball = (dr.sqrt() - 1.0) / (dr.sqrt() + 1.0);
    let mu = (root * root).max(heavy_ball * heavy_ball);
    let lr = (1.0 - mu.sqrt()).powi(2) / h_min;
    Ok((mu, lr))
}
