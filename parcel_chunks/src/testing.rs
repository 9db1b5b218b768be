// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small in-memory datasets for tests, benchmarks and demos.

use glam::DVec3;
use parcel_index::{BuildFlags, IndexConfig, MemorySource, Particle};
use parcel_select::Aabb3;

use crate::error::Result;
use crate::particle_index::ParticleIndex;

/// Support radius of every fixture particle.
pub const SPH_ORIENTATION_SUPPORT_RADIUS: f64 = 0.25;

/// Domain of the fixture.
pub const SPH_ORIENTATION_DOMAIN: Aabb3 = Aabb3::new(DVec3::splat(-4.0), DVec3::splat(4.0));

/// Seven particles marking the axes: one at the origin, then one, two and three unit
/// steps along x, y and z. File 0 holds the origin and the x particle, file 1 the y
/// particles and file 2 the z particles.
pub fn sph_orientation_source() -> MemorySource {
    let h = SPH_ORIENTATION_SUPPORT_RADIUS;
    let p = |x, y, z| Particle::new(DVec3::new(x, y, z), h);
    let mut source = MemorySource::new();
    source.push_file("gas", vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)]);
    source.push_file("gas", vec![p(0.0, 1.0, 0.0), p(0.0, 2.0, 0.0)]);
    source.push_file(
        "gas",
        vec![p(0.0, 0.0, 1.0), p(0.0, 0.0, 2.0), p(0.0, 0.0, 3.0)],
    );
    source
}

/// The orientation fixture as a dataset with unit coarse cells (`order1 = 3`,
/// `order2 = 2`) that never writes its index to disk.
pub fn sph_orientation_dataset() -> Result<ParticleIndex<MemorySource>> {
    let source = sph_orientation_source();
    let registry = source.registry().clone();
    let config = IndexConfig::default()
        .with_orders(3, 2)
        .with_flags(BuildFlags::DONT_CACHE);
    ParticleIndex::new(
        "sph_orientation",
        SPH_ORIENTATION_DOMAIN,
        registry,
        source,
        config,
    )
}
