//! Rotation helpers for orienting elements.
//!
//! Flat elements are defined with their active surface in the local yz-plane,
//! i.e. facing along local +x. Placing such an element on a curved surface
//! requires a rotation that maps +x onto the surface normal. That alone leaves
//! one free degree of freedom (roll about the normal), which is fixed by
//! keeping a reference axis (e.g. the groove direction of a grating) as close
//! as possible to its nominal direction.

#![forbid(unsafe_code)]

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use thiserror::Error;

/// Vectors shorter than this cannot define a direction.
pub const MIN_DIRECTION_NORM: f64 = 1e-12;

/// Errors that can occur while building rotations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RotationError {
    /// The target direction has (numerically) zero length.
    #[error("Cannot align to a zero-length direction")]
    ZeroDirection,
    /// The target direction is parallel to the fixed reference axis, so the
    /// roll about the target is undetermined.
    #[error("Target direction is parallel to the fixed reference axis; roll is undetermined")]
    Degenerate,
}

/// Rotation mapping local +x onto `target` while keeping local +y as close as
/// possible to `fixed`.
///
/// The columns of the returned matrix are the images of the local axes:
/// - x' = `target` normalized
/// - y' = component of `fixed` orthogonal to x', normalized
/// - z' = x' × y'
///
/// # Errors
///
/// Returns [`RotationError::ZeroDirection`] if `target` has zero length and
/// [`RotationError::Degenerate`] if `target` is parallel to `fixed`.
///
/// # Examples
///
/// ```rust
/// use nalgebra::Vector3;
/// use rowland::geometry::rotation::align_x_to;
///
/// let rot = align_x_to(&Vector3::new(0.0, 0.0, 2.0), &Vector3::y()).unwrap();
/// assert!((rot * Vector3::x() - Vector3::z()).norm() < 1e-12);
/// assert!((rot * Vector3::y() - Vector3::y()).norm() < 1e-12);
/// ```
pub fn align_x_to(target: &Vector3<f64>, fixed: &Vector3<f64>) -> Result<Matrix3<f64>, RotationError> {
    let norm = target.norm();
    if norm < MIN_DIRECTION_NORM {
        return Err(RotationError::ZeroDirection);
    }
    let ex = target / norm;
    let ey = fixed - ex * ex.dot(fixed);
    let ey_norm = ey.norm();
    if ey_norm < MIN_DIRECTION_NORM * fixed.norm().max(1.0) {
        return Err(RotationError::Degenerate);
    }
    let ey = ey / ey_norm;
    let ez = ex.cross(&ey);
    Ok(Matrix3::from_columns(&[ex, ey, ez]))
}

/// Rotation about `axis` by `angle` (right-handed, radians).
#[must_use]
pub fn axis_angle(axis: &Unit<Vector3<f64>>, angle: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(axis, angle).into_inner()
}

/// Rotation by `rx` about x, then `ry` about y, then `rz` about z (static
/// axes), i.e. `Rz · Ry · Rx`.
#[must_use]
pub fn rotation_from_xyz(rx: f64, ry: f64, rz: f64) -> Matrix3<f64> {
    Rotation3::from_euler_angles(rx, ry, rz).into_inner()
}
