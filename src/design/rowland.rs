//! Design of a tilted Rowland torus.
//!
//! A grating spectrometer images the dispersed spectrum on the Rowland circle.
//! Spinning that circle about the line through the focal point and a "hinge"
//! point on the circle gives a torus on which gratings and detector can be
//! placed so that both the zeroth order and the dispersed orders focus. This
//! module derives `R`, `r` and the torus placement from three design angles.
//!
//! The on-axis grating sits at distance `f` from the focal point, which is the
//! origin of the design frame. The optical axis is the x axis, dispersion is in
//! the xz-plane.

#![forbid(unsafe_code)]

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::affine::AffineTransform;
use crate::geometry::rotation::axis_angle;
use crate::geometry::torus::{ImplicitTorus, TorusError};

/// Input angles of [`design_tilted_torus`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TiltedTorusParameters {
    /// Distance between the focal point and the on-axis grating.
    pub f: f64,
    /// Angle between the optical axis and the line from the on-axis grating to
    /// the center of the Rowland circle (radians). Typically twice the blaze
    /// angle.
    pub alpha: f64,
    /// Angle between the optical axis and the line from the on-axis grating to
    /// the hinge point on the Rowland circle (radians).
    pub beta: f64,
}

impl TiltedTorusParameters {
    /// Runs [`design_tilted_torus`] with these parameters.
    ///
    /// # Errors
    ///
    /// See [`design_tilted_torus`].
    pub fn design(&self) -> Result<TiltedTorus, TorusError> {
        design_tilted_torus(self.f, self.alpha, self.beta)
    }
}

/// Result of [`design_tilted_torus`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TiltedTorus {
    /// Radius of the torus (R).
    pub major_radius: f64,
    /// Radius of the Rowland circle (r).
    pub minor_radius: f64,
    /// Placement of the torus frame; its translation is the torus center.
    pub placement: AffineTransform,
}

impl TiltedTorus {
    /// Center of the torus in the design frame.
    #[must_use]
    pub fn center(&self) -> Vector3<f64> {
        self.placement.translation()
    }

    /// Builds the implicit surface.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`ImplicitTorus::new`].
    pub fn to_torus(&self) -> Result<ImplicitTorus, TorusError> {
        ImplicitTorus::new(self.major_radius, self.minor_radius, self.placement)
    }
}

impl TryFrom<TiltedTorus> for ImplicitTorus {
    type Error = TorusError;

    fn try_from(design: TiltedTorus) -> Result<Self, Self::Error> {
        design.to_torus()
    }
}

fn invalid(message: String) -> TorusError {
    TorusError::InvalidGeometry { message }
}

/// Designs a torus tilted by the two design angles.
///
/// With the on-axis grating `Cat`, the hinge `H`, the torus center `Ct` and
/// the focal point `F` at the origin:
///
/// ```text
/// r     = f / (2 cos α)
/// |CatH| = r · sqrt(2 (1 + cos(2 (β − α))))
/// |HF|  = sqrt(f² + |CatH|² − 2 f |CatH| cos β)
/// γ     = ± arccos(|HF| / 2r)          sign of α, positive for α = 0
/// R     = f sin(α + γ) / sin(π − 2α − γ) − r
/// |FCt| = f sin α / sin(π − 2α − γ)
/// ```
///
/// The center lies in the xz-plane at angle `α + γ` from the x axis and the
/// torus frame is rotated about +y by `π/2 − α − γ`.
///
/// # Errors
///
/// Returns [`TorusError::InvalidGeometry`] if `f` is not positive, an angle is
/// not finite, or the angles do not produce a torus with positive finite radii.
///
/// # Examples
///
/// ```rust
/// use rowland::design::rowland::design_tilted_torus;
///
/// let design = design_tilted_torus(10.0, 0.06, 0.12).unwrap();
/// assert!((design.major_radius - 4.973).abs() < 1e-3);
/// assert!((design.minor_radius - 5.009).abs() < 1e-3);
/// ```
pub fn design_tilted_torus(f: f64, alpha: f64, beta: f64) -> Result<TiltedTorus, TorusError> {
    if !(f.is_finite() && f > 0.0) {
        return Err(invalid(format!("focal distance f must be positive and finite, got {f}")));
    }
    if !(alpha.is_finite() && beta.is_finite()) {
        return Err(invalid(format!("design angles must be finite, got alpha={alpha}, beta={beta}")));
    }

    let r = f / (2.0 * alpha.cos());
    let cat_h = r * (2.0 * (1.0 + (2.0 * (beta - alpha)).cos())).sqrt();
    let h_f = (2.0 * f * cat_h).mul_add(-beta.cos(), f.mul_add(f, cat_h * cat_h)).sqrt();
    let sign = if alpha < 0.0 { -1.0 } else { 1.0 };
    let gamma = (h_f / (2.0 * r)).acos() * sign;

    let opposite = (PI - alpha - (alpha + gamma)).sin();
    let big_r = f / opposite * (alpha + gamma).sin() - r;
    let f_ct = f / opposite * alpha.sin();
    let center = Vector3::new(f_ct * (alpha + gamma).cos(), 0.0, f_ct * (alpha + gamma).sin());

    if !(big_r.is_finite() && r.is_finite() && center.iter().all(|c| c.is_finite())) {
        return Err(invalid(format!(
            "design angles alpha={alpha}, beta={beta} do not define a torus"
        )));
    }
    if big_r <= 0.0 || r <= 0.0 {
        return Err(invalid(format!(
            "design angles alpha={alpha}, beta={beta} give non-positive radii R={big_r}, r={r}"
        )));
    }

    let rotation = axis_angle(&Vector3::y_axis(), FRAC_PI_2 - alpha - gamma);
    let placement = AffineTransform::compose(&center, &rotation, &Vector3::repeat(1.0));
    tracing::debug!(
        f,
        alpha,
        beta,
        major_radius = big_r,
        minor_radius = r,
        "designed tilted Rowland torus"
    );
    Ok(TiltedTorus {
        major_radius: big_r,
        minor_radius: r,
        placement,
    })
}
