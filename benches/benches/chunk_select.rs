// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::DVec3;
use parcel_chunks::{ChunkStyle, ParticleIndex, Query};
use parcel_index::{BuildFlags, IndexConfig, MemorySource, Particle};
use parcel_select::Aabb3;

struct Rng(u64);

impl Rng {
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
}

fn dataset(files: usize, per_file: usize) -> ParticleIndex<MemorySource> {
    let mut rng = Rng(0xC1A5_7E55_9999_ABCD);
    let mut src = MemorySource::new();
    let width = 100.0 / files as f64;
    for f in 0..files {
        let x0 = f as f64 * width;
        let particles = (0..per_file)
            .map(|_| {
                let p = DVec3::new(
                    x0 + rng.next_f64() * width,
                    rng.next_f64() * 100.0,
                    rng.next_f64() * 100.0,
                );
                Particle::new(p, 0.5)
            })
            .collect();
        src.push_file("gas", particles);
    }
    let registry = src.registry().clone();
    let cfg = IndexConfig::default()
        .with_orders(5, 2)
        .with_flags(BuildFlags::DONT_CACHE);
    let ds = ParticleIndex::new(
        "bench",
        Aabb3::new(DVec3::ZERO, DVec3::splat(100.0)),
        registry,
        src,
        cfg,
    )
    .unwrap();
    ds.index().unwrap();
    ds
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    let ds = dataset(32, 4_000);
    group.throughput(Throughput::Elements(ds.registry().total_particles()));
    for &radius in &[5.0, 20.0, 50.0] {
        group.bench_function(format!("sphere_r{radius}"), |b| {
            b.iter(|| {
                let mut q = ds.sphere(DVec3::splat(50.0), radius).unwrap();
                black_box(ds.select(&mut q).unwrap().len())
            });
        });
    }
    group.finish();
}

fn bench_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunks");
    let ds = dataset(32, 4_000);
    group.bench_function("identify_base_chunk_cold", |b| {
        b.iter(|| {
            let mut q = ds.sphere(DVec3::splat(50.0), 20.0).unwrap();
            ds.identify_base_chunk(&mut q, 0).unwrap();
            black_box(q.candidate_files().len())
        });
    });
    let mut warm: Query = ds.sphere(DVec3::splat(50.0), 20.0).unwrap();
    ds.identify_base_chunk(&mut warm, 0).unwrap();
    group.bench_function("identify_base_chunk_cached", |b| {
        b.iter(|| {
            ds.identify_base_chunk(&mut warm, 0).unwrap();
            black_box(warm.current_chunk().map(|c| c.len()))
        });
    });
    group.bench_function("spatial_ghost_width_toggle", |b| {
        let mut q = ds.sphere(DVec3::splat(50.0), 20.0).unwrap();
        let mut width = 1;
        b.iter(|| {
            width = if width == 1 { 2 } else { 1 };
            black_box(ds.chunks(&mut q, ChunkStyle::Spatial, width).unwrap().len())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_select, bench_chunks);
criterion_main!(benches);
