//! Affine transformations in homogeneous coordinates.
//!
//! Every placed element in an instrument is described by a 4×4 homogeneous
//! matrix that maps the element's local frame into the global design frame.
//! This module provides the [`AffineTransform`] wrapper around
//! [`nalgebra::Matrix4`] with composition from and decomposition into
//! translation, rotation and axis-aligned zoom.
//!
//! Decomposition follows the usual `A = T · R · Z · S` factorisation where `S`
//! is an upper-triangular shear. Shear is not a physically meaningful pose
//! component for rigid optical elements, so [`AffineTransform::decompose_without_shear`]
//! rejects it instead of silently dropping it.
//!
//! The module also contains the position keyword types [`PoseSpec`] and
//! [`PoseList`] used to describe element poses either as a full matrix or as
//! separate position / orientation / zoom parts.

#![forbid(unsafe_code)]

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::ops::Mul;
use thiserror::Error;

/// Absolute tolerance below which a shear component is treated as zero.
pub const SHEAR_TOLERANCE: f64 = 1e-8;

/// Columns of the linear part shorter than this are treated as degenerate.
pub const DEGENERATE_ZOOM_TOLERANCE: f64 = 1e-14;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur when building or decomposing affine transforms.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AffineError {
    /// The transform contains a shear component.
    #[error("Transform includes shear (xy={xy:e}, xz={xz:e}, yz={yz:e}), which is not supported")]
    ShearNotSupported {
        /// Shear between x and y.
        xy: f64,
        /// Shear between x and z.
        xz: f64,
        /// Shear between y and z.
        yz: f64,
    },
    /// The linear part of the transform is singular (an axis is scaled to zero).
    #[error("Transform is singular and cannot be inverted or decomposed")]
    Singular,
    /// A full pose was combined with separate position keywords.
    #[error(
        "If a full pose is specified, position, orientation and zoom cannot be given at the same time"
    )]
    AmbiguousPosition,
    /// A pose list does not contain any position information.
    #[error("Pose list does not specify any of pose, position, orientation or zoom")]
    MissingPosition,
    /// The lists of a pose list have different lengths.
    #[error("All entries of a pose list must have the same length: `{field}` has {found}, expected {expected}")]
    LengthMismatch {
        /// Name of the offending list.
        field: &'static str,
        /// Length of the first list that was given.
        expected: usize,
        /// Length of the offending list.
        found: usize,
    },
}

// =============================================================================
// AFFINE TRANSFORM
// =============================================================================

/// A 4×4 homogeneous affine transform.
///
/// The transform acts on column vectors: `p_global = M · p_local`. Products
/// therefore apply the rightmost factor first.
///
/// # Examples
///
/// ```rust
/// use nalgebra::{Matrix3, Vector3};
/// use rowland::geometry::affine::AffineTransform;
///
/// let t = AffineTransform::compose(
///     &Vector3::new(1.0, 2.0, 3.0),
///     &Matrix3::identity(),
///     &Vector3::new(2.0, 2.0, 2.0),
/// );
/// let p = t.transform_point(&Vector3::new(1.0, 0.0, 0.0));
/// assert_eq!(p, Vector3::new(3.0, 2.0, 3.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffineTransform {
    matrix: Matrix4<f64>,
}

/// Translation, rotation, zoom and shear parts of an [`AffineTransform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposition {
    /// Translation vector.
    pub translation: Vector3<f64>,
    /// Proper orthonormal rotation (determinant +1).
    pub rotation: Matrix3<f64>,
    /// Zoom along the local x, y and z axes.
    pub zoom: Vector3<f64>,
    /// Shear components `(xy, xz, yz)`.
    pub shear: Vector3<f64>,
}

impl Decomposition {
    /// Returns `true` if all shear components are zero within [`SHEAR_TOLERANCE`].
    #[must_use]
    pub fn is_shear_free(&self) -> bool {
        self.shear.iter().all(|s| s.abs() <= SHEAR_TOLERANCE)
    }

    /// Pure translation part as a transform.
    #[must_use]
    pub fn translation_transform(&self) -> AffineTransform {
        AffineTransform::from_translation(&self.translation)
    }

    /// Pure rotation part as a transform.
    #[must_use]
    pub fn rotation_transform(&self) -> AffineTransform {
        AffineTransform::from_rotation(&self.rotation)
    }

    /// Pure zoom part as a transform.
    #[must_use]
    pub fn zoom_transform(&self) -> AffineTransform {
        AffineTransform::from_zoom(&self.zoom)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix4<f64>> for AffineTransform {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }
}

impl Mul for AffineTransform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            matrix: self.matrix * rhs.matrix,
        }
    }
}

impl AffineTransform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wraps an arbitrary 4×4 matrix.
    ///
    /// No validation is done here; shear and singularity are detected when the
    /// transform is decomposed or inverted.
    #[must_use]
    pub const fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// The underlying homogeneous matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// A pure translation.
    #[must_use]
    pub fn from_translation(translation: &Vector3<f64>) -> Self {
        Self {
            matrix: Matrix4::new_translation(translation),
        }
    }

    /// A pure rotation (or any linear map) embedded in homogeneous coordinates.
    #[must_use]
    pub fn from_rotation(rotation: &Matrix3<f64>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    /// A pure axis-aligned zoom.
    #[must_use]
    pub fn from_zoom(zoom: &Vector3<f64>) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(zoom),
        }
    }

    /// Composes `T · R · Z` from translation, rotation and zoom.
    #[must_use]
    pub fn compose(translation: &Vector3<f64>, rotation: &Matrix3<f64>, zoom: &Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(rotation * Matrix3::from_diagonal(zoom)));
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self { matrix }
    }

    /// Translation column of the transform.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Upper-left 3×3 linear part (rotation · zoom · shear).
    #[must_use]
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Applies `other` after `self`, i.e. returns `other · self`.
    #[must_use]
    pub fn then(&self, other: &Self) -> Self {
        Self {
            matrix: other.matrix * self.matrix,
        }
    }

    /// Maps a point (homogeneous `w = 1`).
    #[must_use]
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let h = self.matrix * Vector4::new(point.x, point.y, point.z, 1.0);
        Vector3::new(h.x, h.y, h.z)
    }

    /// Maps a direction (homogeneous `w = 0`); translation does not apply.
    #[must_use]
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.linear() * vector
    }

    /// Inverse transform.
    ///
    /// # Errors
    ///
    /// Returns [`AffineError::Singular`] if the matrix cannot be inverted.
    pub fn inverse(&self) -> Result<Self, AffineError> {
        self.matrix
            .try_inverse()
            .map(Self::from_matrix)
            .ok_or(AffineError::Singular)
    }

    /// Decomposes the transform into translation, rotation, zoom and shear.
    ///
    /// The linear part is factorised column by column with Gram–Schmidt
    /// orthogonalisation. If the orthonormal factor is improper (a
    /// reflection), the x zoom and the first rotation column change sign so
    /// that the returned rotation always has determinant +1.
    ///
    /// # Errors
    ///
    /// Returns [`AffineError::Singular`] if a column of the linear part is
    /// (numerically) zero or linearly dependent on the previous ones.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nalgebra::{Matrix3, Vector3};
    /// use rowland::geometry::affine::AffineTransform;
    ///
    /// let t = AffineTransform::compose(
    ///     &Vector3::new(0.5, 0.0, -1.0),
    ///     &Matrix3::identity(),
    ///     &Vector3::new(1.0, 2.0, 3.0),
    /// );
    /// let parts = t.decompose().unwrap();
    /// assert_eq!(parts.zoom, Vector3::new(1.0, 2.0, 3.0));
    /// assert!(parts.is_shear_free());
    /// ```
    pub fn decompose(&self) -> Result<Decomposition, AffineError> {
        let linear = self.linear();
        let mut m0: Vector3<f64> = linear.column(0).into_owned();
        let mut m1: Vector3<f64> = linear.column(1).into_owned();
        let mut m2: Vector3<f64> = linear.column(2).into_owned();

        let mut sx = m0.norm();
        if sx < DEGENERATE_ZOOM_TOLERANCE {
            return Err(AffineError::Singular);
        }
        m0 /= sx;

        let sx_sxy = m0.dot(&m1);
        m1 -= sx_sxy * m0;
        let sy = m1.norm();
        if sy < DEGENERATE_ZOOM_TOLERANCE {
            return Err(AffineError::Singular);
        }
        m1 /= sy;
        let sxy = sx_sxy / sx;

        let sx_sxz = m0.dot(&m2);
        let sy_syz = m1.dot(&m2);
        m2 -= sx_sxz * m0 + sy_syz * m1;
        let sz = m2.norm();
        if sz < DEGENERATE_ZOOM_TOLERANCE {
            return Err(AffineError::Singular);
        }
        m2 /= sz;
        let sxz = sx_sxz / sx;
        let syz = sy_syz / sy;

        let mut rotation = Matrix3::from_columns(&[m0, m1, m2]);
        if rotation.determinant() < 0.0 {
            sx = -sx;
            rotation.column_mut(0).neg_mut();
        }

        Ok(Decomposition {
            translation: self.translation(),
            rotation,
            zoom: Vector3::new(sx, sy, sz),
            shear: Vector3::new(sxy, sxz, syz),
        })
    }

    /// Decomposes the transform and rejects any shear component.
    ///
    /// # Errors
    ///
    /// Returns [`AffineError::ShearNotSupported`] if any shear component
    /// exceeds [`SHEAR_TOLERANCE`], or [`AffineError::Singular`] if the
    /// transform cannot be decomposed at all.
    pub fn decompose_without_shear(&self) -> Result<Decomposition, AffineError> {
        let parts = self.decompose()?;
        if !parts.is_shear_free() {
            return Err(AffineError::ShearNotSupported {
                xy: parts.shear.x,
                xz: parts.shear.y,
                yz: parts.shear.z,
            });
        }
        Ok(parts)
    }
}

// =============================================================================
// POSITION KEYWORDS
// =============================================================================

/// Zoom given either as one factor for all axes or per axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Zoom {
    /// The same zoom along x, y and z.
    Uniform(f64),
    /// Separate zoom along x, y and z.
    PerAxis([f64; 3]),
}

impl Default for Zoom {
    fn default() -> Self {
        Self::Uniform(1.0)
    }
}

impl Zoom {
    /// Zoom factors as a vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        match self {
            Self::Uniform(z) => Vector3::repeat(z),
            Self::PerAxis(z) => Vector3::from(z),
        }
    }
}

/// Pose of an element given as keywords.
///
/// Either `pose` is set to a full transform, or any combination of
/// `position`, `orientation` and `zoom` is given. Missing parts default to no
/// translation, no rotation and unit zoom.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSpec {
    /// Full transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<AffineTransform>,
    /// Position of the element center in the parent frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3<f64>>,
    /// Orientation of the element axes relative to the parent frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Matrix3<f64>>,
    /// Size of the element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<Zoom>,
}

impl PoseSpec {
    /// A spec that resolves to the identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A spec holding a full transform.
    #[must_use]
    pub fn from_pose(pose: AffineTransform) -> Self {
        Self {
            pose: Some(pose),
            ..Self::default()
        }
    }

    /// Sets the position.
    #[must_use]
    pub const fn with_position(mut self, position: Vector3<f64>) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the orientation.
    #[must_use]
    pub const fn with_orientation(mut self, orientation: Matrix3<f64>) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Sets the zoom.
    #[must_use]
    pub const fn with_zoom(mut self, zoom: Zoom) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Resolves the keywords into one transform.
    ///
    /// # Errors
    ///
    /// Returns [`AffineError::AmbiguousPosition`] if `pose` is combined with
    /// any of `position`, `orientation` or `zoom`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nalgebra::Vector3;
    /// use rowland::geometry::affine::{AffineTransform, PoseSpec, Zoom};
    ///
    /// let spec = PoseSpec::new().with_zoom(Zoom::Uniform(0.2));
    /// let pose = spec.resolve().unwrap();
    /// assert_eq!(pose, AffineTransform::from_zoom(&Vector3::repeat(0.2)));
    ///
    /// let ambiguous = PoseSpec::from_pose(AffineTransform::identity())
    ///     .with_position(Vector3::zeros());
    /// assert!(ambiguous.resolve().is_err());
    /// ```
    pub fn resolve(&self) -> Result<AffineTransform, AffineError> {
        if let Some(pose) = self.pose {
            if self.position.is_some() || self.orientation.is_some() || self.zoom.is_some() {
                return Err(AffineError::AmbiguousPosition);
            }
            return Ok(pose);
        }
        Ok(AffineTransform::compose(
            &self.position.unwrap_or_else(Vector3::zeros),
            &self.orientation.unwrap_or_else(Matrix3::identity),
            &self.zoom.unwrap_or_default().to_vector(),
        ))
    }
}

/// Poses for a list of elements given column-wise.
///
/// Each field holds one entry per element. All given lists must have the
/// same length; entries at the same index are combined into one [`PoseSpec`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseList {
    /// Full transforms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Vec<AffineTransform>>,
    /// Element positions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec<Vector3<f64>>>,
    /// Element orientations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Vec<Matrix3<f64>>>,
    /// Element zooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<Vec<Zoom>>,
}

impl PoseList {
    /// Number of elements described by the list.
    ///
    /// # Errors
    ///
    /// Returns [`AffineError::MissingPosition`] if no list is given and
    /// [`AffineError::LengthMismatch`] if the given lists differ in length.
    pub fn element_count(&self) -> Result<usize, AffineError> {
        let lengths = [
            ("pose", self.pose.as_ref().map(Vec::len)),
            ("position", self.position.as_ref().map(Vec::len)),
            ("orientation", self.orientation.as_ref().map(Vec::len)),
            ("zoom", self.zoom.as_ref().map(Vec::len)),
        ];
        let mut expected: Option<usize> = None;
        for (field, len) in lengths {
            let Some(found) = len else { continue };
            match expected {
                None => expected = Some(found),
                Some(expected) if expected != found => {
                    return Err(AffineError::LengthMismatch {
                        field,
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
        }
        expected.ok_or(AffineError::MissingPosition)
    }

    /// Resolves the list into one transform per element.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`PoseList::element_count`] and [`PoseSpec::resolve`].
    pub fn resolve(&self) -> Result<Vec<AffineTransform>, AffineError> {
        let n = self.element_count()?;
        (0..n)
            .map(|i| {
                PoseSpec {
                    pose: self.pose.as_ref().map(|v| v[i]),
                    position: self.position.as_ref().map(|v| v[i]),
                    orientation: self.orientation.as_ref().map(|v| v[i]),
                    zoom: self.zoom.as_ref().map(|v| v[i]),
                }
                .resolve()
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
