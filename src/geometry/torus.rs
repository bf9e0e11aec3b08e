//! Implicit Rowland torus.
//!
//! The Rowland torus is the locus of best focus for a curved diffraction
//! geometry. In its local frame the symmetry axis is z and the surface is the
//! zero set of the quartic
//!
//! ```text
//! F(x, y, z) = (x² + y² + z² + R² − r²)² − 4R²(x² + y²)
//! ```
//!
//! where `R` is the radius of the torus (the distance from the symmetry axis to
//! the center of the Rowland circle) and `r` is the radius of the Rowland
//! circle. A placement transform maps the local frame into the global design
//! frame.

#![forbid(unsafe_code)]

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::affine::{AffineError, AffineTransform};
use crate::geometry::root_finding::{
    RootFindingConfig, RootFindingError, brent, scan_sign_changes,
};

/// Relative tolerance `|F / R⁴|` within which a point counts as on the surface.
pub const ON_SURFACE_TOLERANCE: f64 = 1e-8;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur when building or querying an [`ImplicitTorus`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TorusError {
    /// Torus parameters or placement do not describe a valid torus.
    #[error("Invalid torus geometry: {message}")]
    InvalidGeometry {
        /// Description of the problem.
        message: String,
    },
    /// The placement transform is not usable.
    #[error("Invalid torus placement: {source}")]
    InvalidPlacement {
        /// The underlying transform error.
        #[from]
        source: AffineError,
    },
    /// No intersection with the torus was found inside the search bracket.
    #[error("Intersection with torus not found along {axis:?} in [{lower}, {upper}]: {source}")]
    NoIntersection {
        /// The free axis that was solved for.
        axis: Axis,
        /// Lower end of the bracket.
        lower: f64,
        /// Upper end of the bracket.
        upper: f64,
        /// The root finder failure.
        #[source]
        source: RootFindingError,
    },
    /// A surface normal was requested for a point that is not on the torus.
    #[error("Gradient is only defined on the torus surface; |F/R^4| = {residual:e}")]
    NotOnSurface {
        /// Normalized quartic residual at the point.
        residual: f64,
    },
}

/// Cartesian axis selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl Axis {
    /// Component index of the axis.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Builds a point from the two `fixed` coordinates (in x, y, z order,
    /// skipping this axis) and `value` on this axis.
    #[must_use]
    pub const fn assemble(self, fixed: [f64; 2], value: f64) -> Vector3<f64> {
        match self {
            Self::X => Vector3::new(value, fixed[0], fixed[1]),
            Self::Y => Vector3::new(fixed[0], value, fixed[1]),
            Self::Z => Vector3::new(fixed[0], fixed[1], value),
        }
    }
}

// =============================================================================
// IMPLICIT TORUS
// =============================================================================

/// Torus with the local z axis as symmetry axis.
///
/// # Examples
///
/// ```rust
/// use nalgebra::Vector3;
/// use rowland::geometry::affine::AffineTransform;
/// use rowland::geometry::torus::ImplicitTorus;
///
/// let torus = ImplicitTorus::new(2.0, 1.0, AffineTransform::identity()).unwrap();
/// // The outer equator of the tube lies at distance R + r from the axis.
/// assert_eq!(torus.quartic(&Vector3::new(3.0, 0.0, 0.0)), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TorusParameters", into = "TorusParameters")]
pub struct ImplicitTorus {
    major_radius: f64,
    minor_radius: f64,
    placement: AffineTransform,
    inverse_placement: AffineTransform,
    rotation: Matrix3<f64>,
    solver: RootFindingConfig,
}

/// Serializable parameters of an [`ImplicitTorus`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TorusParameters {
    /// Radius of the torus.
    pub major_radius: f64,
    /// Radius of the Rowland circle.
    pub minor_radius: f64,
    /// Placement of the local torus frame in the global frame.
    #[serde(default)]
    pub placement: AffineTransform,
    /// Settings for [`ImplicitTorus::solve_axis`].
    #[serde(default)]
    pub solver: RootFindingConfig,
}

impl TryFrom<TorusParameters> for ImplicitTorus {
    type Error = TorusError;

    fn try_from(params: TorusParameters) -> Result<Self, Self::Error> {
        Ok(Self::new(params.major_radius, params.minor_radius, params.placement)?.with_solver(params.solver))
    }
}

impl From<ImplicitTorus> for TorusParameters {
    fn from(torus: ImplicitTorus) -> Self {
        Self {
            major_radius: torus.major_radius,
            minor_radius: torus.minor_radius,
            placement: torus.placement,
            solver: torus.solver,
        }
    }
}

fn validate_radii(major_radius: f64, minor_radius: f64) -> Result<(), TorusError> {
    if !(major_radius.is_finite() && major_radius > 0.0) {
        return Err(TorusError::InvalidGeometry {
            message: format!("torus radius R must be positive and finite, got {major_radius}"),
        });
    }
    if !(minor_radius.is_finite() && minor_radius > 0.0) {
        return Err(TorusError::InvalidGeometry {
            message: format!("Rowland circle radius r must be positive and finite, got {minor_radius}"),
        });
    }
    Ok(())
}

impl ImplicitTorus {
    /// Creates a torus with radius `major_radius` (R), Rowland circle radius
    /// `minor_radius` (r) and the given placement.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::InvalidGeometry`] if either radius is not a
    /// positive finite number and [`TorusError::InvalidPlacement`] if the
    /// placement is singular or contains shear.
    pub fn new(major_radius: f64, minor_radius: f64, placement: AffineTransform) -> Result<Self, TorusError> {
        validate_radii(major_radius, minor_radius)?;
        let (inverse_placement, rotation) = Self::placement_parts(&placement)?;
        Ok(Self {
            major_radius,
            minor_radius,
            placement,
            inverse_placement,
            rotation,
            solver: RootFindingConfig::default(),
        })
    }

    fn placement_parts(placement: &AffineTransform) -> Result<(AffineTransform, Matrix3<f64>), TorusError> {
        let parts = placement.decompose_without_shear()?;
        Ok((placement.inverse()?, parts.rotation))
    }

    /// Uses `config` for all subsequent [`ImplicitTorus::solve_axis`] calls.
    #[must_use]
    pub const fn with_solver(mut self, config: RootFindingConfig) -> Self {
        self.solver = config;
        self
    }

    /// Radius of the torus (R).
    #[must_use]
    pub const fn major_radius(&self) -> f64 {
        self.major_radius
    }

    /// Radius of the Rowland circle (r).
    #[must_use]
    pub const fn minor_radius(&self) -> f64 {
        self.minor_radius
    }

    /// Placement of the local torus frame.
    #[must_use]
    pub const fn placement(&self) -> &AffineTransform {
        &self.placement
    }

    /// Root finder settings.
    #[must_use]
    pub const fn solver(&self) -> &RootFindingConfig {
        &self.solver
    }

    /// Replaces both radii.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::InvalidGeometry`] and leaves the torus unchanged
    /// if either radius is invalid.
    pub fn set_radii(&mut self, major_radius: f64, minor_radius: f64) -> Result<(), TorusError> {
        validate_radii(major_radius, minor_radius)?;
        self.major_radius = major_radius;
        self.minor_radius = minor_radius;
        Ok(())
    }

    /// Replaces the placement.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::InvalidPlacement`] and leaves the torus unchanged
    /// if the placement is singular or contains shear.
    pub fn set_placement(&mut self, placement: AffineTransform) -> Result<(), TorusError> {
        let (inverse_placement, rotation) = Self::placement_parts(&placement)?;
        self.placement = placement;
        self.inverse_placement = inverse_placement;
        self.rotation = rotation;
        Ok(())
    }

    /// Maps a global point into the local torus frame.
    #[must_use]
    pub fn to_local(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.inverse_placement.transform_point(point)
    }

    /// Quartic evaluated at a point already in the local frame.
    #[must_use]
    pub fn quartic_local(&self, local: &Vector3<f64>) -> f64 {
        let r2 = self.major_radius * self.major_radius;
        let s = local.norm_squared() + r2 - self.minor_radius * self.minor_radius;
        (4.0 * r2).mul_add(-local.x.mul_add(local.x, local.y * local.y), s * s)
    }

    /// Quartic evaluated at a global point. Points on the torus give zero up
    /// to rounding on the scale of `R⁴`.
    #[must_use]
    pub fn quartic(&self, point: &Vector3<f64>) -> f64 {
        self.quartic_local(&self.to_local(point))
    }

    /// Quartic evaluated at many global points.
    #[must_use]
    pub fn quartic_many(&self, points: &[Vector3<f64>]) -> Vec<f64> {
        points.iter().map(|p| self.quartic(p)).collect()
    }

    /// Quartic normalized by `R⁴`, the natural scale of its rounding error.
    #[must_use]
    pub fn normalized_residual(&self, point: &Vector3<f64>) -> f64 {
        self.quartic(point) / self.major_radius.powi(4)
    }

    /// Solves for the coordinate on `axis` such that the point lies on the
    /// torus, with the other two global coordinates held at `fixed` (in x, y,
    /// z order, skipping `axis`).
    ///
    /// `bracket` must isolate exactly one of the up to four intersections of
    /// the line with the torus; this is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::NoIntersection`] if the quartic does not change
    /// sign across the bracket or the solver fails to converge.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rowland::geometry::affine::AffineTransform;
    /// use rowland::geometry::torus::{Axis, ImplicitTorus};
    ///
    /// let torus = ImplicitTorus::new(2.0, 1.0, AffineTransform::identity()).unwrap();
    /// let x = torus.solve_axis([0.0, 0.0], Axis::X, (2.5, 3.5)).unwrap();
    /// assert!((x - 3.0).abs() < 1e-10);
    /// ```
    pub fn solve_axis(&self, fixed: [f64; 2], axis: Axis, bracket: (f64, f64)) -> Result<f64, TorusError> {
        brent(
            |value| self.quartic(&axis.assemble(fixed, value)),
            bracket,
            &self.solver,
        )
        .map_err(|source| TorusError::NoIntersection {
            axis,
            lower: bracket.0,
            upper: bracket.1,
            source,
        })
    }

    /// Finds all intersections along `axis` inside `bracket` by sampling it
    /// `samples` times and solving every sub-interval with a sign change.
    ///
    /// Returns the roots in ascending order; an empty list means no
    /// intersection was resolved at this sampling density.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::NoIntersection`] if the bracket is invalid or a
    /// sub-interval fails to converge.
    pub fn scan_axis(
        &self,
        fixed: [f64; 2],
        axis: Axis,
        bracket: (f64, f64),
        samples: usize,
    ) -> Result<Vec<f64>, TorusError> {
        let to_error = |source| TorusError::NoIntersection {
            axis,
            lower: bracket.0,
            upper: bracket.1,
            source,
        };
        let sub_brackets = scan_sign_changes(
            |value| self.quartic(&axis.assemble(fixed, value)),
            bracket,
            samples,
        )
        .map_err(to_error)?;
        sub_brackets
            .into_iter()
            .map(|sub| self.solve_axis(fixed, axis, sub))
            .collect()
    }

    /// Gradient of the quartic at a point on the surface, in global
    /// coordinates.
    ///
    /// The analytic gradient is computed in the local frame and rotated back
    /// with the rotation of the placement. Translation and zoom do not apply to
    /// directions. The vector is not normalized.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::NotOnSurface`] if `|F / R⁴|` exceeds
    /// [`ON_SURFACE_TOLERANCE`].
    pub fn normal(&self, point: &Vector3<f64>) -> Result<Vector3<f64>, TorusError> {
        let local = self.to_local(point);
        let residual = self.quartic_local(&local) / self.major_radius.powi(4);
        if residual.abs() > ON_SURFACE_TOLERANCE {
            return Err(TorusError::NotOnSurface { residual });
        }
        let r2 = self.major_radius * self.major_radius;
        let factor = 4.0 * (local.norm_squared() + r2 - self.minor_radius * self.minor_radius);
        let gradient = Vector3::new(
            factor.mul_add(local.x, -8.0 * r2 * local.x),
            factor.mul_add(local.y, -8.0 * r2 * local.y),
            factor * local.z,
        );
        Ok(self.rotation * gradient)
    }

    /// Gradients for many points; fails on the first off-surface point.
    ///
    /// # Errors
    ///
    /// See [`ImplicitTorus::normal`].
    pub fn normal_many(&self, points: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>, TorusError> {
        points.iter().map(|p| self.normal(p)).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
