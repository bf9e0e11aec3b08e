//! Property-based tests for [`ImplicitTorus`].
//!
//! Verifies that points generated from the torus parametrization satisfy the
//! quartic, that the gradient is the parametric surface normal, and that the
//! line solver recovers known intersections.

#![forbid(unsafe_code)]

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Vector3};
use proptest::prelude::*;
use rowland::geometry::affine::AffineTransform;
use rowland::geometry::rotation::rotation_from_xyz;
use rowland::geometry::torus::{Axis, ImplicitTorus};

// =============================================================================
// Strategies
// =============================================================================

/// Ring torus radii `(R, r)` with `r < 0.9 R`.
fn ring_radii() -> impl Strategy<Value = (f64, f64)> {
    (0.5_f64..5.0).prop_flat_map(|big| (Just(big), (0.05 * big)..(0.9 * big)))
}

/// Rigid placement with translations up to 10 and arbitrary rotation.
fn placement() -> impl Strategy<Value = (Vector3<f64>, Matrix3<f64>)> {
    let t = -10.0_f64..10.0;
    let a = -3.1_f64..3.1;
    ((t.clone(), t.clone(), t), (a.clone(), a.clone(), a)).prop_map(|((x, y, z), (rx, ry, rz))| {
        (Vector3::new(x, y, z), rotation_from_xyz(rx, ry, rz))
    })
}

/// Surface parameters: tube angle and angle about the symmetry axis.
fn surface_angles() -> impl Strategy<Value = (f64, f64)> {
    (-3.1_f64..3.1, -3.1_f64..3.1)
}

fn surface_point(big: f64, small: f64, theta: f64, phi: f64) -> Vector3<f64> {
    let ring = small.mul_add(theta.cos(), big);
    Vector3::new(ring * phi.cos(), ring * phi.sin(), small * theta.sin())
}

// =============================================================================
// Tests
// =============================================================================

proptest! {
    /// Parametric surface points are zeros of the quartic in any placement.
    #[test]
    fn prop_parametric_points_on_surface(
        (big, small) in ring_radii(),
        (translation, rotation) in placement(),
        (theta, phi) in surface_angles(),
    ) {
        let pose = AffineTransform::compose(&translation, &rotation, &Vector3::repeat(1.0));
        let torus = ImplicitTorus::new(big, small, pose).unwrap();
        let global = pose.transform_point(&surface_point(big, small, theta, phi));
        let residual = torus.normalized_residual(&global);
        prop_assert!(residual.abs() < 1e-9, "residual {residual:e} at {global:?}");
    }

    /// The quartic gradient is parallel to the parametric normal.
    #[test]
    fn prop_gradient_is_surface_normal(
        (big, small) in ring_radii(),
        (translation, rotation) in placement(),
        (theta, phi) in surface_angles(),
    ) {
        let pose = AffineTransform::compose(&translation, &rotation, &Vector3::repeat(1.0));
        let torus = ImplicitTorus::new(big, small, pose).unwrap();
        let global = pose.transform_point(&surface_point(big, small, theta, phi));
        let normal = torus.normal(&global).unwrap().normalize();
        let expected = rotation
            * Vector3::new(theta.cos() * phi.cos(), theta.cos() * phi.sin(), theta.sin());
        prop_assert!(
            (normal - expected).norm() < 1e-6,
            "normal {normal:?} differs from {expected:?}"
        );
    }

    /// A line parallel to x at height `z` inside the tube hits the outer half
    /// of the tube at `R + sqrt(r² − z²)`.
    #[test]
    fn prop_solve_axis_recovers_outer_intersection(
        (big, small) in ring_radii(),
        z_fraction in -0.9_f64..0.9,
        shift in -5.0_f64..5.0,
    ) {
        let placement = AffineTransform::from_translation(&Vector3::new(shift, 0.0, 0.0));
        let torus = ImplicitTorus::new(big, small, placement).unwrap();
        let z = z_fraction * small;
        let expected = shift + big + small.mul_add(small, -z * z).sqrt();
        let bracket = (shift + big, shift + big + 1.5 * small);
        let x = torus.solve_axis([0.0, z], Axis::X, bracket).unwrap();
        prop_assert!((x - expected).abs() < 1e-9, "x = {x}, expected {expected}");
    }

    /// Scanning the full diameter finds all four intersections in order.
    #[test]
    fn prop_scan_axis_finds_all_intersections((big, small) in ring_radii()) {
        let torus = ImplicitTorus::new(big, small, AffineTransform::identity()).unwrap();
        let extent = big + small + 0.1;
        let roots = torus.scan_axis([0.0, 0.0], Axis::X, (-extent, extent), 997).unwrap();
        prop_assert_eq!(roots.len(), 4);
        let expected = [-(big + small), small - big, big - small, big + small];
        for (root, want) in roots.iter().zip(expected) {
            prop_assert!((root - want).abs() < 1e-9, "root {root}, expected {want}");
        }
    }
}

#[test]
fn test_normal_requires_surface_point() {
    let torus = ImplicitTorus::new(2.0, 0.5, AffineTransform::identity()).unwrap();
    assert!(torus.normal(&Vector3::new(2.0, 0.0, 0.0)).is_err());
    let n = torus.normal(&Vector3::new(-2.5, 0.0, 0.0)).unwrap();
    assert_relative_eq!(n.normalize(), -Vector3::x(), epsilon = 1e-12);
}
