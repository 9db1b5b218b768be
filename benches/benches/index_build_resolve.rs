// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::DVec3;
use parcel_index::{BuildFlags, IndexConfig, MemorySource, Particle, SpatialBitmapIndex};
use parcel_select::{Aabb3, Axis, Selector};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn domain() -> Aabb3 {
    Aabb3::new(DVec3::ZERO, DVec3::splat(100.0))
}

/// Files hold spatially coherent slabs along x, like a snapshot written in domain order.
fn gen_slab_files(files: usize, per_file: usize, h: f64) -> MemorySource {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    let mut src = MemorySource::new();
    let width = 100.0 / files as f64;
    for f in 0..files {
        let x0 = f as f64 * width;
        let particles = (0..per_file)
            .map(|_| {
                let p = DVec3::new(
                    rng.range(x0, x0 + width),
                    rng.range(0.0, 100.0),
                    rng.range(0.0, 100.0),
                );
                Particle::new(p, rng.range(0.0, h))
            })
            .collect();
        src.push_file("gas", particles);
    }
    src
}

/// Every file samples the whole domain: the worst case, every cell collides.
fn gen_mixed_files(files: usize, per_file: usize, h: f64) -> MemorySource {
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    let mut src = MemorySource::new();
    for _ in 0..files {
        let particles = (0..per_file)
            .map(|_| {
                let p = DVec3::new(
                    rng.range(0.0, 100.0),
                    rng.range(0.0, 100.0),
                    rng.range(0.0, 100.0),
                );
                Particle::new(p, h)
            })
            .collect();
        src.push_file("gas", particles);
    }
    src
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &(files, per_file) in &[(16usize, 2_000usize), (64, 2_000)] {
        let slabs = gen_slab_files(files, per_file, 0.5);
        let mixed = gen_mixed_files(files, per_file, 0.5);
        group.throughput(Throughput::Elements((files * per_file) as u64));
        for (name, src) in [("slabs", &slabs), ("mixed", &mixed)] {
            for (tag, flags) in [
                ("refined", BuildFlags::empty()),
                ("coarse", BuildFlags::NO_REFINE),
            ] {
                let cfg = IndexConfig::default().with_orders(5, 2).with_flags(flags);
                group.bench_function(format!("{name}_{tag}_files{files}"), |b| {
                    b.iter(|| {
                        let idx = SpatialBitmapIndex::build(domain(), src.registry(), src, &cfg)
                            .unwrap();
                        black_box(idx.collisions().count_ones());
                    });
                });
            }
        }
    }
    group.finish();
}

fn queries() -> Vec<(&'static str, Selector)> {
    let sphere = Selector::sphere(DVec3::splat(50.0), 10.0).unwrap();
    let region = Selector::region(DVec3::splat(20.0), DVec3::new(40.0, 90.0, 60.0)).unwrap();
    vec![
        ("sphere", sphere.clone()),
        ("region", region.clone()),
        (
            "disk",
            Selector::disk(DVec3::splat(50.0), DVec3::new(1.0, 1.0, 0.0), 30.0, 2.0).unwrap(),
        ),
        (
            "ray",
            Selector::ray(DVec3::splat(1.0), DVec3::new(99.0, 60.0, 30.0)).unwrap(),
        ),
        ("slice", Selector::slice(Axis::Z, 33.3).unwrap()),
        (
            "cutting",
            Selector::cutting_plane(DVec3::ONE, DVec3::splat(50.0)).unwrap(),
        ),
        ("region_minus_sphere", region - sphere),
    ]
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let src = gen_slab_files(64, 2_000, 0.5);
    let cfg = IndexConfig::default().with_orders(5, 2);
    let idx = SpatialBitmapIndex::build(domain(), src.registry(), &src, &cfg).unwrap();
    for (name, sel) in queries() {
        group.bench_function(name, |b| {
            b.iter(|| black_box(idx.resolve(&sel, 0).candidates.len()));
        });
    }
    let sphere = Selector::sphere(DVec3::splat(50.0), 10.0).unwrap();
    for &ghost_width in &[1u32, 2, 4] {
        group.bench_function(format!("sphere_ghost{ghost_width}"), |b| {
            b.iter(|| black_box(idx.resolve(&sphere, ghost_width).buffers.len()));
        });
    }
    group.finish();
}

fn bench_persist(c: &mut Criterion) {
    let mut group = c.benchmark_group("persist");
    let src = gen_slab_files(64, 2_000, 0.5);
    let cfg = IndexConfig::default().with_orders(5, 2);
    let idx = SpatialBitmapIndex::build(domain(), src.registry(), &src, &cfg).unwrap();
    let bytes = idx.to_bytes().unwrap();
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("to_bytes", |b| {
        b.iter(|| black_box(idx.to_bytes().unwrap().len()));
    });
    group.bench_function("from_bytes", |b| {
        b.iter_batched(
            || bytes.clone(),
            |data| black_box(SpatialBitmapIndex::from_bytes(&data).unwrap().file_count()),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_resolve, bench_persist);
criterion_main!(benches);
