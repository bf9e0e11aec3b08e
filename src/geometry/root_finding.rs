//! Bracketed scalar root finding.
//!
//! Points on the Rowland torus are found by holding two coordinates fixed and
//! solving the quartic for the third. A line can cross a torus up to four
//! times, so the solver works on a caller-supplied bracket that must isolate a
//! single root. [`brent`] is the primary, single-root path;
//! [`scan_sign_changes`] samples a wider interval and reports every
//! sub-bracket with a sign change for callers that cannot guarantee
//! uniqueness up front.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during bracketed root finding.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RootFindingError {
    /// The function has the same sign at both ends of the bracket.
    #[error("No sign change in bracket [{lower}, {upper}]: f(lower)={f_lower:e}, f(upper)={f_upper:e}")]
    NoSignChange {
        /// Lower end of the bracket.
        lower: f64,
        /// Upper end of the bracket.
        upper: f64,
        /// Function value at the lower end.
        f_lower: f64,
        /// Function value at the upper end.
        f_upper: f64,
    },
    /// The function returned a non-finite value.
    #[error("Function is not finite at x={x}")]
    NonFinite {
        /// Location of the non-finite value.
        x: f64,
    },
    /// The iteration budget was exhausted before the tolerance was met.
    #[error("Root finding did not converge after {iterations} iterations (last estimate {estimate})")]
    NotConverged {
        /// Number of iterations performed.
        iterations: usize,
        /// Last root estimate.
        estimate: f64,
    },
    /// The bracket is not a finite interval.
    #[error("Invalid bracket [{lower}, {upper}]")]
    InvalidBracket {
        /// Lower end of the bracket.
        lower: f64,
        /// Upper end of the bracket.
        upper: f64,
    },
}

/// Convergence settings for [`brent`].
///
/// The iteration stops when the bracket half-width drops below
/// `(xtol + rtol·|x|) / 2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootFindingConfig {
    /// Absolute tolerance on the root location.
    pub xtol: f64,
    /// Relative tolerance on the root location.
    pub rtol: f64,
    /// Maximum number of function evaluations after the bracket ends.
    pub max_iterations: usize,
}

impl Default for RootFindingConfig {
    fn default() -> Self {
        config_presets::standard()
    }
}

/// Predefined solver configurations.
pub mod config_presets {
    use super::RootFindingConfig;

    /// Tolerances matching a typical double-precision Brent solver.
    #[must_use]
    pub const fn standard() -> RootFindingConfig {
        RootFindingConfig {
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            max_iterations: 100,
        }
    }

    /// Tightest tolerance reachable in double precision.
    #[must_use]
    pub const fn precise() -> RootFindingConfig {
        RootFindingConfig {
            xtol: 0.0,
            rtol: 4.0 * f64::EPSILON,
            max_iterations: 200,
        }
    }

    /// Loose tolerance for quick previews of large layouts.
    #[must_use]
    pub const fn fast() -> RootFindingConfig {
        RootFindingConfig {
            xtol: 1e-8,
            rtol: 1e-10,
            max_iterations: 50,
        }
    }
}

fn evaluate<F: FnMut(f64) -> f64>(f: &mut F, x: f64) -> Result<f64, RootFindingError> {
    let value = f(x);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RootFindingError::NonFinite { x })
    }
}

/// Finds a root of `f` inside `bracket` with Brent's method.
///
/// The function must change sign between the bracket ends. If more than one
/// root lies inside the bracket, one of them is returned without warning.
///
/// # Errors
///
/// - [`RootFindingError::InvalidBracket`] if an end is not finite
/// - [`RootFindingError::NoSignChange`] if `f` has the same sign at both ends
/// - [`RootFindingError::NonFinite`] if `f` returns NaN or infinity
/// - [`RootFindingError::NotConverged`] if the iteration budget runs out
///
/// # Examples
///
/// ```rust
/// use rowland::geometry::root_finding::{RootFindingConfig, brent};
///
/// let root = brent(|x| x * x - 2.0, (0.0, 2.0), &RootFindingConfig::default()).unwrap();
/// assert!((root - 2.0_f64.sqrt()).abs() < 1e-11);
/// ```
pub fn brent<F>(mut f: F, bracket: (f64, f64), config: &RootFindingConfig) -> Result<f64, RootFindingError>
where
    F: FnMut(f64) -> f64,
{
    let (lower, upper) = bracket;
    if !lower.is_finite() || !upper.is_finite() {
        return Err(RootFindingError::InvalidBracket { lower, upper });
    }

    let mut xpre = lower;
    let mut xcur = upper;
    let mut fpre = evaluate(&mut f, xpre)?;
    let mut fcur = evaluate(&mut f, xcur)?;

    if fpre * fcur > 0.0 {
        return Err(RootFindingError::NoSignChange {
            lower,
            upper,
            f_lower: fpre,
            f_upper: fcur,
        });
    }
    if fpre == 0.0 {
        return Ok(xpre);
    }
    if fcur == 0.0 {
        return Ok(xcur);
    }

    let trace = std::env::var_os("ROWLAND_DEBUG_SOLVER").is_some();
    let mut xblk = 0.0;
    let mut fblk = 0.0;
    let mut spre = 0.0;
    let mut scur = 0.0;

    for iteration in 0..config.max_iterations {
        if fpre != 0.0 && fcur != 0.0 && (fpre.is_sign_negative() != fcur.is_sign_negative()) {
            xblk = xpre;
            fblk = fpre;
            scur = xcur - xpre;
            spre = scur;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;

            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (config.xtol + config.rtol * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            if trace {
                tracing::debug!(iteration, root = xcur, "brent converged");
            }
            return Ok(xcur);
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // secant
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // inverse quadratic extrapolation
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };
            if 2.0 * stry.abs() < spre.abs().min(3.0f64.mul_add(sbis.abs(), -delta)) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = evaluate(&mut f, xcur)?;

        if trace {
            tracing::debug!(iteration, x = xcur, fx = fcur, "brent step");
        }
    }

    tracing::warn!(
        max_iterations = config.max_iterations,
        estimate = xcur,
        "brent root finding did not converge"
    );
    Err(RootFindingError::NotConverged {
        iterations: config.max_iterations,
        estimate: xcur,
    })
}

/// Samples `f` at `samples + 1` evenly spaced points of `bracket` and returns
/// every sub-interval that contains a sign change (or an exact zero, as a
/// degenerate interval).
///
/// Roots closer together than the sampling step can be missed; the result is
/// a set of single-root brackets suitable for [`brent`].
///
/// # Errors
///
/// Returns [`RootFindingError::InvalidBracket`] for a non-finite or empty
/// bracket or zero samples, and [`RootFindingError::NonFinite`] if `f` is not
/// finite at a sample point.
pub fn scan_sign_changes<F>(
    mut f: F,
    bracket: (f64, f64),
    samples: usize,
) -> Result<Vec<(f64, f64)>, RootFindingError>
where
    F: FnMut(f64) -> f64,
{
    let (lower, upper) = bracket;
    if !lower.is_finite() || !upper.is_finite() || upper <= lower || samples == 0 {
        return Err(RootFindingError::InvalidBracket { lower, upper });
    }

    #[expect(clippy::cast_precision_loss, reason = "sample counts are far below 2^52")]
    let step = (upper - lower) / samples as f64;
    let mut brackets = Vec::new();

    let mut x_prev = lower;
    let mut f_prev = evaluate(&mut f, x_prev)?;
    if f_prev == 0.0 {
        brackets.push((x_prev, x_prev));
    }
    for i in 1..=samples {
        #[expect(clippy::cast_precision_loss, reason = "sample counts are far below 2^52")]
        let x = if i == samples { upper } else { (i as f64).mul_add(step, lower) };
        let fx = evaluate(&mut f, x)?;
        if fx == 0.0 {
            brackets.push((x, x));
        } else if f_prev != 0.0 && f_prev.is_sign_negative() != fx.is_sign_negative() {
            brackets.push((x_prev, x));
        }
        x_prev = x;
        f_prev = fx;
    }
    Ok(brackets)
}
