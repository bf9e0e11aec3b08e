//! Property-based tests for the facet tiling of an annulus segment.
//!
//! The tiling must never overlap facets, keep every facet inside its
//! segment, cover the full radius range, and put every facet center on the
//! Rowland torus.

#![forbid(unsafe_code)]

use std::f64::consts::TAU;

use proptest::prelude::*;
use rowland::design::facet_array::{FacetArray, FacetArrayConfig, FacetArrayConfigBuilder};
use rowland::design::rowland::design_tilted_torus;
use rowland::geometry::affine::AffineTransform;
use rowland::geometry::torus::ImplicitTorus;

// =============================================================================
// Strategies
// =============================================================================

/// Annulus segments `(radius, phi, d_facet)` with a span shorter than 2π.
fn segment() -> impl Strategy<Value = ((f64, f64), (f64, f64), f64)> {
    (0.0_f64..3.0, 0.1_f64..2.0, -3.0_f64..3.0, 0.2_f64..6.0, 0.05_f64..0.5).prop_map(
        |(inner, width, phi0, span, d)| ((inner, inner + width), (phi0, phi0 + span), d),
    )
}

fn array(radius: (f64, f64), phi: (f64, f64), d_facet: f64) -> FacetArray {
    let torus = ImplicitTorus::new(10.0, 1.0, AffineTransform::identity()).unwrap();
    let config = FacetArrayConfigBuilder::default()
        .radius(radius)
        .phi(phi)
        .d_facet(d_facet)
        .x_range((-20.0, 20.0))
        .build()
        .unwrap();
    FacetArray::new(torus, config).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

proptest! {
    /// Larger rings never hold fewer facets.
    #[test]
    fn prop_angular_count_grows_with_radius(
        (radius, phi, d) in segment(),
        r_small in 0.0_f64..5.0,
        r_extra in 0.0_f64..5.0,
    ) {
        let facets = array(radius, phi, d);
        let inner = facets.tile_count_angular(r_small);
        let outer = facets.tile_count_angular(r_small + r_extra);
        prop_assert!(inner <= outer, "{inner} facets at {r_small}, {outer} at {}", r_small + r_extra);
    }

    /// Facets on a ring stay inside the segment and do not overlap.
    #[test]
    fn prop_angles_inside_segment_without_overlap(
        (radius, phi, d) in segment(),
        ring in 0.5_f64..5.0,
    ) {
        let facets = array(radius, phi, d);
        let ring = ring.max(d);
        let width = d / ring;
        let span = facets.angular_span();
        let offsets: Vec<f64> = facets
            .angles(ring)
            .iter()
            .map(|a| (a - phi.0).rem_euclid(TAU))
            .collect();
        prop_assert_eq!(offsets.len(), facets.tile_count_angular(ring));
        for offset in &offsets {
            prop_assert!(*offset >= width / 2.0 - 1e-9, "offset {offset} below segment start");
            prop_assert!(*offset <= span - width / 2.0 + 1e-9, "offset {offset} past segment end {span}");
        }
        for pair in offsets.windows(2) {
            prop_assert!(pair[1] - pair[0] >= width - 1e-9, "facets overlap: {pair:?}");
        }
    }

    /// Rings are one facet apart, centered on the mean radius, and cover the
    /// radius range.
    #[test]
    fn prop_rings_cover_radius_range((radius, phi, d) in segment()) {
        let facets = array(radius, phi, d);
        let radii = facets.radii();
        prop_assert_eq!(radii.len(), facets.tile_count_radial());
        let rings = f64::from(u32::try_from(radii.len()).unwrap());
        prop_assert!(rings * d >= radius.1 - radius.0 - 1e-12);
        let mean = radii.iter().sum::<f64>() / rings;
        prop_assert!((mean - f64::midpoint(radius.0, radius.1)).abs() < 1e-9);
        for pair in radii.windows(2) {
            prop_assert!((pair[1] - pair[0] - d).abs() < 1e-12);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Facet centers lie on the designed torus and the facets face the focus.
    #[test]
    fn prop_nominal_poses_on_designed_torus(d in 0.1_f64..0.3, phi0 in -3.0_f64..3.0) {
        let torus = design_tilted_torus(10.0, 0.06, 0.12).unwrap().to_torus().unwrap();
        let config = FacetArrayConfig {
            phi: (phi0, phi0 + 1.0),
            ..FacetArrayConfigBuilder::default()
                .radius((0.5, 1.0))
                .d_facet(d)
                .x_range((8.0, 11.0))
                .build()
                .unwrap()
        };
        let facets = FacetArray::new(torus, config).unwrap();
        let poses = facets.nominal_poses().unwrap();
        let expected: usize = facets.radii().iter().map(|r| facets.tile_count_angular(*r)).sum();
        prop_assert_eq!(poses.len(), expected);
        for pose in &poses {
            let center = pose.translation();
            let residual = facets.torus().normalized_residual(&center);
            prop_assert!(residual.abs() < 1e-9, "residual {residual:e} at {center:?}");
            let facing = pose.linear().column(0).into_owned();
            prop_assert!((facing - center.normalize()).norm() < 1e-12);
        }
    }
}
