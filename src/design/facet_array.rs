//! Tiling of a Rowland torus with flat facets.
//!
//! Facets are arranged in concentric rings around the optical axis (x). Ring
//! radii and polar angles are measured in the yz-plane with `phi = 0` on the
//! positive z axis, `y = radius · sin(phi)` and `z = radius · cos(phi)`. For
//! every (radius, angle) pair the x coordinate is found by intersecting the
//! line parallel to the optical axis with the torus.
//!
//! Rings are spaced by the facet size and may reach past the requested radius
//! range, while facets on a ring are spread evenly and never reach beyond the
//! angular limits.

#![forbid(unsafe_code)]

use std::f64::consts::TAU;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembly::parallel::{TilingError, TilingStrategy};
use crate::geometry::affine::AffineTransform;
use crate::geometry::rotation::{RotationError, align_x_to};
use crate::geometry::torus::{Axis, ImplicitTorus, TorusError};

/// Angles with a magnitude above this are assumed to be given in degrees.
pub const MAX_ANGLE_RADIANS: f64 = 10.0;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while placing facets on a torus.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FacetPlacementError {
    /// The tiling parameters are inconsistent.
    #[error("Invalid facet array geometry: {message}")]
    InvalidGeometry {
        /// Description of the problem.
        message: String,
    },
    /// The angular limits look like degrees.
    #[error("Input angles phi=({phi0}, {phi1}) are much larger than 2 pi. Did you use degrees (radians expected)?")]
    UnitMixup {
        /// Start angle.
        phi0: f64,
        /// End angle.
        phi1: f64,
    },
    /// A facet position could not be found on the torus.
    #[error("Facet placement on torus failed: {0}")]
    Torus(#[from] TorusError),
    /// A facet orientation could not be constructed.
    #[error("Facet orientation failed: {0}")]
    Rotation(#[from] RotationError),
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// How facets are oriented on the torus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetOrientation {
    /// The facet normal points at the focal point (the origin), so the facet
    /// is perpendicular to perfectly focused rays.
    #[default]
    FocusFacing,
    /// The facet is tangent to the torus at its center.
    TangentToTorus,
}

/// Geometry of a facet array.
///
/// # Examples
///
/// ```rust
/// use rowland::design::facet_array::FacetArrayConfigBuilder;
///
/// let config = FacetArrayConfigBuilder::default()
///     .radius((0.5, 1.0))
///     .d_facet(0.25)
///     .x_range((8.0, 11.0))
///     .build()
///     .unwrap();
/// assert_eq!(config.phi, (0.0, std::f64::consts::TAU));
///
/// // Degrees instead of radians are rejected.
/// assert!(
///     FacetArrayConfigBuilder::default()
///         .radius((0.5, 1.0))
///         .phi((0.0, 180.0))
///         .d_facet(0.25)
///         .x_range((8.0, 11.0))
///         .build()
///         .is_err()
/// );
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct FacetArrayConfig {
    /// Inner and outer radius of the covered annulus in the yz-plane.
    pub radius: (f64, f64),
    /// Start and end angle of the covered segment (radians, counterclockwise).
    /// `phi.1 < phi.0` is allowed for segments that cross `phi = 0`.
    #[builder(default = "(0.0, TAU)")]
    #[serde(default = "full_circle")]
    pub phi: (f64, f64),
    /// Edge length of a square facet including its frame.
    pub d_facet: f64,
    /// Search interval for the x coordinate of the intersection with the
    /// torus. It must contain exactly one intersection for every ring.
    pub x_range: (f64, f64),
    /// Orientation of the facets.
    #[builder(default)]
    #[serde(default)]
    pub orientation: FacetOrientation,
}

const fn full_circle() -> (f64, f64) {
    (0.0, TAU)
}

fn check_geometry(
    radius: (f64, f64),
    phi: (f64, f64),
    d_facet: f64,
    x_range: (f64, f64),
) -> Result<(), FacetPlacementError> {
    let invalid = |message: String| Err(FacetPlacementError::InvalidGeometry { message });
    if !(radius.0.is_finite() && radius.1.is_finite()) || radius.1 <= radius.0 {
        return invalid(format!(
            "outer radius must be larger than inner radius, got {radius:?}"
        ));
    }
    if radius.0 < 0.0 {
        return invalid(format!("radius must be positive, got {radius:?}"));
    }
    if !(d_facet.is_finite() && d_facet > 0.0) {
        return invalid(format!("facet size must be positive, got {d_facet}"));
    }
    if !(x_range.0.is_finite() && x_range.1.is_finite()) || x_range.1 <= x_range.0 {
        return invalid(format!("x_range must be an increasing interval, got {x_range:?}"));
    }
    if !(phi.0.is_finite() && phi.1.is_finite()) {
        return invalid(format!("angular limits must be finite, got {phi:?}"));
    }
    if phi.0.abs() > MAX_ANGLE_RADIANS || phi.1.abs() > MAX_ANGLE_RADIANS {
        return Err(FacetPlacementError::UnitMixup {
            phi0: phi.0,
            phi1: phi.1,
        });
    }
    Ok(())
}

impl FacetArrayConfig {
    /// Checks the invariants that [`FacetArrayConfigBuilder`] enforces; used
    /// for configs that were deserialized or assembled by hand.
    ///
    /// # Errors
    ///
    /// Returns [`FacetPlacementError::InvalidGeometry`] for an empty or
    /// negative radius range, a non-positive facet size or an empty x range,
    /// and [`FacetPlacementError::UnitMixup`] for `|phi| > 10`.
    pub fn validate(&self) -> Result<(), FacetPlacementError> {
        check_geometry(self.radius, self.phi, self.d_facet, self.x_range)
    }
}

impl FacetArrayConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match (self.radius, self.d_facet, self.x_range) {
            (Some(radius), Some(d_facet), Some(x_range)) => check_geometry(
                radius,
                self.phi.unwrap_or_else(full_circle),
                d_facet,
                x_range,
            )
            .map_err(|err| err.to_string()),
            // Missing fields are reported by the generated build function.
            _ => Ok(()),
        }
    }
}

// =============================================================================
// FACET ARRAY
// =============================================================================

/// Facets distributed over an annulus segment on a Rowland torus.
#[derive(Clone, Debug, PartialEq)]
pub struct FacetArray {
    torus: ImplicitTorus,
    config: FacetArrayConfig,
}

impl FacetArray {
    /// Creates a facet array on `torus`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`FacetArrayConfig::validate`].
    pub fn new(torus: ImplicitTorus, config: FacetArrayConfig) -> Result<Self, FacetPlacementError> {
        config.validate()?;
        Ok(Self { torus, config })
    }

    /// The torus the facets are placed on.
    #[must_use]
    pub const fn torus(&self) -> &ImplicitTorus {
        &self.torus
    }

    /// The tiling geometry.
    #[must_use]
    pub const fn config(&self) -> &FacetArrayConfig {
        &self.config
    }

    /// Angle covered by facets.
    ///
    /// A segment from `phi0` to `phi1` that is negative or larger than 2π is
    /// reduced modulo 2π; exactly 2π covers the full circle.
    #[must_use]
    pub fn angular_span(&self) -> f64 {
        let (phi0, phi1) = self.config.phi;
        let span = phi1 - phi0;
        if !(0.0..=TAU).contains(&span) {
            span.rem_euclid(TAU)
        } else {
            span
        }
    }

    /// Number of rings needed to cover the radius range.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "validated positive finite ratio of lengths"
    )]
    pub fn tile_count_radial(&self) -> usize {
        let (inner, outer) = self.config.radius;
        ((outer - inner) / self.config.d_facet).ceil() as usize
    }

    /// Radii of the ring centers.
    ///
    /// Rings are spread symmetrically around the mean radius with a pitch of
    /// one facet size; the outermost rings can overhang the radius range.
    #[must_use]
    pub fn radii(&self) -> Vec<f64> {
        let n = self.tile_count_radial();
        let mean = f64::midpoint(self.config.radius.0, self.config.radius.1);
        #[expect(clippy::cast_precision_loss, reason = "ring counts are small")]
        let half = n as f64 / 2.0;
        (0..n)
            .map(|k| {
                #[expect(clippy::cast_precision_loss, reason = "ring counts are small")]
                let offset = k as f64 - half + 0.5;
                offset.mul_add(self.config.d_facet, mean)
            })
            .collect()
    }

    /// Number of facets that fit on the ring at `radius`.
    ///
    /// The inner edge of the ring is the most crowded, so the count is taken
    /// at `radius − d_facet / 2`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "checked positive and finite before the cast"
    )]
    pub fn tile_count_angular(&self, radius: f64) -> usize {
        let d = self.config.d_facet;
        let n = ((radius - d / 2.0) * self.angular_span() / d).floor();
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }

    /// Center angles of the facets on the ring at `radius`, reduced to
    /// `[0, 2π)`.
    ///
    /// Each facet spans its arc width at the ring, `d_facet / radius`
    /// radians. The free angle is split into equal gaps before, between and
    /// after the facets. A ring too short for a single facet stays empty.
    #[must_use]
    pub fn angles(&self, radius: f64) -> Vec<f64> {
        let n = self.tile_count_angular(radius);
        if n == 0 {
            return Vec::new();
        }
        let width = self.config.d_facet / radius;
        let phi0 = self.config.phi.0;
        #[expect(clippy::cast_precision_loss, reason = "facet counts are small")]
        let nf = n as f64;
        let gap = nf.mul_add(-width, self.angular_span()) / (nf + 1.0);
        (0..n)
            .map(|k| {
                #[expect(clippy::cast_precision_loss, reason = "facet counts are small")]
                let k = k as f64;
                (phi0 + gap + width / 2.0 + k * (gap + width)).rem_euclid(TAU)
            })
            .collect()
    }

    /// Point on the torus at polar coordinates (`radius`, `angle`) in the
    /// yz-plane.
    ///
    /// # Errors
    ///
    /// Returns [`TorusError::NoIntersection`] if the torus does not intersect
    /// the line within `x_range`.
    pub fn point_on_surface(&self, radius: f64, angle: f64) -> Result<Vector3<f64>, TorusError> {
        let (sin, cos) = angle.sin_cos();
        let y = radius * sin;
        let z = radius * cos;
        let x = self.torus.solve_axis([y, z], Axis::X, self.config.x_range)?;
        Ok(Vector3::new(x, y, z))
    }

    /// Position of the array center: the surface point at the mean radius and
    /// the middle of the angular span.
    ///
    /// # Errors
    ///
    /// See [`FacetArray::point_on_surface`].
    pub fn ideal_center(&self) -> Result<Vector3<f64>, TorusError> {
        let radius = f64::midpoint(self.config.radius.0, self.config.radius.1);
        let angle = (self.config.phi.0 + self.angular_span() / 2.0).rem_euclid(TAU);
        self.point_on_surface(radius, angle)
    }

    fn facet_pose(&self, radius: f64, angle: f64) -> Result<AffineTransform, FacetPlacementError> {
        let position = self.point_on_surface(radius, angle)?;
        let normal = match self.config.orientation {
            FacetOrientation::FocusFacing => position,
            FacetOrientation::TangentToTorus => self.torus.normal(&position)?,
        };
        // Grooves run along local y and stay as parallel to e_y as possible.
        let rotation = align_x_to(&normal, &Vector3::y())?;
        Ok(AffineTransform::compose(&position, &rotation, &Vector3::repeat(1.0)))
    }

    /// Poses that move a unit facet, centered on the origin with its active
    /// surface in the yz-plane, to every facet position, ring by ring from the
    /// inside out.
    ///
    /// # Errors
    ///
    /// Returns the first failure from [`FacetArray::point_on_surface`], the
    /// torus normal, or [`align_x_to`].
    pub fn nominal_poses(&self) -> Result<Vec<AffineTransform>, FacetPlacementError> {
        let radii = self.radii();
        let mut poses = Vec::new();
        for &radius in &radii {
            for angle in self.angles(radius) {
                poses.push(self.facet_pose(radius, angle)?);
            }
        }
        tracing::debug!(
            rings = radii.len(),
            facets = poses.len(),
            "placed facets on Rowland torus"
        );
        Ok(poses)
    }
}

impl TilingStrategy for FacetArray {
    fn nominal_poses(&self) -> Result<Vec<AffineTransform>, TilingError> {
        Ok(Self::nominal_poses(self)?)
    }

    fn id_col(&self) -> Option<&str> {
        Some("facet")
    }
}

// =============================================================================
// TESTS
// =============================================================================
