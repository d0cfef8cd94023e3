//! Benchmarks for 2D automaton evolution
//!
//! Compares the dense full-grid scan against whole-generation runs at
//! different board sizes and densities.
//!
//! Run with: cargo bench --bench cellular_evolution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use morphogen::generators::{CellularParams, GeneratorKind, SeedCondition};
use morphogen::grid::AutomatonGrid;
use morphogen::rules::life_step;

fn seeded_grid(size: usize, density: f64) -> AutomatonGrid {
    // Deterministic pseudo-random fill so runs are comparable
    let mut grid = AutomatonGrid::new(size, size);
    let mut state = 0x2545_f491u32;
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            if ((state >> 8) as f64 / (1u32 << 24) as f64) < density {
                grid.set(x, y, true);
            }
        }
    }
    grid
}

fn bench_dense_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("life_step_dense");
    for size in [16usize, 32, 50] {
        let grid = seeded_grid(size, 0.3);
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| {
                let (next, deltas) = life_step(black_box(grid));
                black_box((next, deltas));
            });
        });
    }
    group.finish();
}

fn bench_full_generation_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for &(density, label) in &[(0.1f64, "sparse"), (0.5f64, "dense")] {
        let params = CellularParams {
            width: 32,
            height: 32,
            generations: 64,
            seed: SeedCondition::Random,
            density,
            ..Default::default()
        };
        let kind = GeneratorKind::Cellular(params);
        group.bench_function(label, |b| {
            b.iter(|| black_box(kind.generate_or_fallback()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dense_scan, bench_full_generation_run);
criterion_main!(benches);
