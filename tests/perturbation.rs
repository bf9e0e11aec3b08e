//! Tolerance studies on a facet array.
//!
//! Global and individual misalignments agree for pure translations and
//! differ for rotations, because a global rotation acts about the assembly
//! center and an individual one about each element center.

#![forbid(unsafe_code)]

use approx::assert_relative_eq;
use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rowland::prelude::*;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn gratings() -> ParallelAssembly<Facet> {
    let torus = design_tilted_torus(10.0, 0.06, 0.12).unwrap().to_torus().unwrap();
    let config = FacetArrayConfigBuilder::default()
        .radius((0.5, 1.0))
        .d_facet(0.25)
        .x_range((8.0, 11.0))
        .build()
        .unwrap();
    let tiling = FacetArray::new(torus, config).unwrap();
    ParallelAssembly::<Facet>::builder(ElementArgs::new().with_param("d", 2e-4))
        .tiled_by(&tiling)
        .build()
        .unwrap()
}

fn poses(assembly: &ParallelAssembly<Facet>) -> Vec<AffineTransform> {
    assembly.elements().iter().map(|e| *e.pose()).collect()
}

fn assert_poses_close(a: &[AffineTransform], b: &[AffineTransform]) {
    assert_eq!(a.len(), b.len());
    for (pa, pb) in a.iter().zip(b) {
        assert_relative_eq!(*pa.matrix(), *pb.matrix(), epsilon = 1e-10);
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = f64::from(u32::try_from(values.len()).unwrap());
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

#[test]
fn test_global_and_individual_translation_agree() {
    init_tracing();
    let shift = Displacement::translation(0.0, -20.0, 0.0);
    let mut global = gratings();
    let mut individual = gratings();
    move_global(&mut global, &shift).unwrap();
    move_individual(&mut individual, &shift).unwrap();
    assert_poses_close(&poses(&global), &poses(&individual));

    let nominal = gratings();
    for (moved, fixed) in global.elements().iter().zip(nominal.elements()) {
        assert_relative_eq!(
            moved.pose().translation(),
            fixed.pose().translation() + Vector3::new(0.0, -20.0, 0.0),
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_global_and_individual_rotation_differ() {
    let tilt = Displacement::rotation(0.0, 0.2, -1.0);
    let mut global = gratings();
    let mut individual = gratings();
    move_global(&mut global, &tilt).unwrap();
    move_individual(&mut individual, &tilt).unwrap();

    let nominal = gratings();
    for ((g, i), n) in global
        .elements()
        .iter()
        .zip(individual.elements())
        .zip(nominal.elements())
    {
        // Individual rotations keep the centers; global ones swing them
        // about the assembly origin.
        assert_relative_eq!(i.pose().translation(), n.pose().translation(), epsilon = 1e-12);
        assert!((g.pose().translation() - n.pose().translation()).norm() > 1.0);
        assert_relative_eq!(g.pose().linear(), i.pose().linear(), epsilon = 1e-12);
    }
}

#[test]
fn test_placement_translation_matches_shifted_positions() {
    let offset = Vector3::new(0.3, -0.7, 1.1);
    let mut placed = gratings();
    placed.set_placement(AffineTransform::from_translation(&offset));
    placed.generate().unwrap();

    let mut shifted = gratings();
    let positions = shifted
        .elem_pos()
        .iter()
        .map(|p| AffineTransform::from_translation(&offset) * *p)
        .collect();
    shifted.set_elem_pos(positions);
    shifted.generate().unwrap();

    assert_poses_close(&poses(&placed), &poses(&shifted));
}

#[test]
fn test_wiggle_is_reproducible_per_seed() {
    let sigma = Displacement {
        dx: 1e-3,
        dy: 1e-3,
        dz: 1e-3,
        rx: 1e-4,
        ry: 1e-4,
        rz: 1e-4,
    };
    let mut a = gratings();
    let mut b = gratings();
    let mut c = gratings();
    wiggle(&mut a, &sigma, &mut StdRng::seed_from_u64(17)).unwrap();
    wiggle(&mut b, &sigma, &mut StdRng::seed_from_u64(17)).unwrap();
    wiggle(&mut c, &sigma, &mut StdRng::seed_from_u64(18)).unwrap();
    assert_eq!(poses(&a), poses(&b));
    assert_ne!(poses(&a), poses(&c));

    // Resetting the uncertainties restores the nominal layout.
    let nominal = gratings();
    let count = a.element_count();
    *a.elem_uncertainty_mut() = vec![AffineTransform::identity(); count];
    a.generate().unwrap();
    assert_poses_close(&poses(&a), &poses(&nominal));
}

#[test]
fn test_wiggle_draws_with_requested_spread() {
    let mut assembly = ParallelAssembly::<Facet>::builder(ElementArgs::new().with_param("d", 2e-4))
        .positions(vec![AffineTransform::identity(); 4000])
        .build()
        .unwrap();
    let sigma = Displacement::translation(0.0, 0.5, 0.0);
    wiggle(&mut assembly, &sigma, &mut StdRng::seed_from_u64(5)).unwrap();

    let dy: Vec<f64> = assembly.elem_uncertainty().iter().map(|u| u.translation().y).collect();
    let (mean, std) = mean_and_std(&dy);
    assert!(mean.abs() < 0.05, "mean {mean}");
    assert!((std - 0.5).abs() < 0.05, "std {std}");
    for u in assembly.elem_uncertainty() {
        assert_eq!(u.translation().x, 0.0);
        assert_eq!(u.translation().z, 0.0);
        assert_eq!(u.linear(), nalgebra::Matrix3::identity());
    }
}

#[test]
fn test_invalid_sigma_leaves_assembly_untouched() {
    let mut assembly = gratings();
    move_individual(&mut assembly, &Displacement::translation(1e-3, 0.0, 0.0)).unwrap();
    let before = poses(&assembly);
    let result = wiggle(
        &mut assembly,
        &Displacement::rotation(0.0, f64::NAN, 0.0),
        &mut StdRng::seed_from_u64(1),
    );
    assert!(matches!(result, Err(PerturbError::InvalidSigma { component: "ry", .. })));
    assert_eq!(poses(&assembly), before);
}
