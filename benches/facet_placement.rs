//! Benchmarks for facet placement on a Rowland torus.
//!
//! 1. **`ImplicitTorus::solve_axis`**: a single line intersection
//! 2. **`FacetArray::nominal_poses`**: tiling for several facet sizes
//! 3. **`ParallelAssembly::generate`**: pose composition and element construction
//! 4. **`wiggle`**: random misalignment of a full array
//!
//! `ROWLAND_BENCH_SEED` (decimal or 0x-hex) sets the seed of the random
//! misalignment. Defaults to 0x5EED.

#![allow(missing_docs)] // Criterion macros generate undocumented functions

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rowland::prelude::*;
use std::hint::black_box;
use std::sync::OnceLock;

fn get_benchmark_seed() -> u64 {
    static SEED: OnceLock<u64> = OnceLock::new();
    *SEED.get_or_init(|| {
        std::env::var("ROWLAND_BENCH_SEED")
            .ok()
            .and_then(|s| {
                let s = s.trim();
                s.strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .map_or_else(|| s.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
            })
            .unwrap_or(0x5EED)
    })
}

fn designed_torus() -> ImplicitTorus {
    design_tilted_torus(10.0, 0.06, 0.12).unwrap().to_torus().unwrap()
}

fn tiling(d_facet: f64) -> FacetArray {
    let config = FacetArrayConfigBuilder::default()
        .radius((0.5, 1.0))
        .d_facet(d_facet)
        .x_range((8.0, 11.0))
        .build()
        .unwrap();
    FacetArray::new(designed_torus(), config).unwrap()
}

fn gratings(d_facet: f64) -> ParallelAssembly<Facet> {
    let tiling = tiling(d_facet);
    ParallelAssembly::<Facet>::builder(ElementArgs::new().with_param("d", 2e-4))
        .tiled_by(&tiling)
        .build()
        .unwrap()
}

fn benchmark_solve_axis(c: &mut Criterion) {
    let torus = designed_torus();
    let mut group = c.benchmark_group("solve_axis");
    for (name, config) in [
        ("standard", config_presets::standard()),
        ("precise", config_presets::precise()),
        ("fast", config_presets::fast()),
    ] {
        let torus = torus.clone().with_solver(config);
        group.bench_function(name, |b| {
            b.iter(|| black_box(torus.solve_axis(black_box([0.3, 0.6]), Axis::X, (8.0, 11.0)).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_nominal_poses(c: &mut Criterion) {
    let mut group = c.benchmark_group("nominal_poses");
    for d_facet in [0.25, 0.1, 0.05] {
        let tiling = tiling(d_facet);
        let facets: usize = tiling.radii().iter().map(|r| tiling.tile_count_angular(*r)).sum();
        group.throughput(Throughput::Elements(facets as u64));
        group.bench_with_input(BenchmarkId::from_parameter(facets), &tiling, |b, tiling| {
            b.iter(|| black_box(tiling.nominal_poses().unwrap()));
        });
    }
    group.finish();
}

fn benchmark_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for d_facet in [0.25, 0.05] {
        let assembly = gratings(d_facet);
        let count = assembly.element_count();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &assembly, |b, assembly| {
            b.iter_batched(
                || assembly.clone(),
                |mut assembly| {
                    assembly.generate().unwrap();
                    black_box(assembly)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn benchmark_wiggle(c: &mut Criterion) {
    let assembly = gratings(0.05);
    let sigma = Displacement {
        dx: 1e-3,
        dy: 1e-3,
        dz: 1e-3,
        rx: 1e-4,
        ry: 1e-4,
        rz: 1e-4,
    };
    let seed = get_benchmark_seed();
    c.bench_function("wiggle", |b| {
        b.iter_batched(
            || (assembly.clone(), StdRng::seed_from_u64(seed)),
            |(mut assembly, mut rng)| {
                wiggle(&mut assembly, &sigma, &mut rng).unwrap();
                black_box(assembly)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        benchmark_solve_axis,
        benchmark_nominal_poses,
        benchmark_generate,
        benchmark_wiggle
);
criterion_main!(benches);
