//! Benchmark for voxel grid access and snapshots.
//!
//! Run with: cargo bench --package bloxim_voxel --bench grid_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use bloxim_voxel::{VoxelCell, VoxelGrid};

fn terrain(shape: [u32; 3]) -> VoxelGrid {
    let mut grid = VoxelGrid::new(shape);
    let top = shape[1] as i32 / 4;
    grid.fill([0, 0, 0], [shape[0] as i32 - 1, top, shape[2] as i32 - 1], VoxelCell::material_only(1));
    grid
}

fn benchmark_point_access(c: &mut Criterion) {
    let mut grid = terrain([128, 64, 128]);

    let mut group = c.benchmark_group("point_access");
    group.throughput(Throughput::Elements(1));
    group.bench_function("get", |b| {
        let mut i = 0i32;
        b.iter(|| {
            i = i.wrapping_add(7);
            black_box(grid.get(i & 127, (i >> 7) & 63, (i >> 3) & 127))
        });
    });
    group.bench_function("set", |b| {
        let mut i = 0i32;
        b.iter(|| {
            i = i.wrapping_add(7);
            black_box(grid.set(i & 127, (i >> 7) & 63, (i >> 3) & 127, VoxelCell::new(2, 1)))
        });
    });
    group.finish();
}

fn benchmark_range_scan(c: &mut Criterion) {
    let grid = terrain([128, 64, 128]);

    c.bench_function("iter_range_8x8x8", |b| {
        b.iter(|| {
            black_box(
                grid.iter_range([60, 10, 60], [67, 17, 67])
                    .filter(|(_, cell)| !cell.is_air())
                    .count(),
            )
        });
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let grid = terrain([128, 64, 128]);
    let bytes = grid.to_bytes();

    let mut group = c.benchmark_group("snapshot");
    group.sample_size(20);
    group.bench_function("to_bytes", |b| b.iter(|| black_box(grid.to_bytes())));
    group.bench_function("from_bytes", |b| {
        b.iter(|| black_box(VoxelGrid::from_bytes(&bytes)))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_point_access,
    benchmark_range_scan,
    benchmark_snapshot,
);
criterion_main!(benches);
