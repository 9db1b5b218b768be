// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bitmap index basics.
//!
//! Build an index over three in-memory files, resolve a few selectors, then persist the
//! index and load it back.
//!
//! Run:
//! - `cargo run -p parcel_demos --example index_basics`

use glam::DVec3;
use parcel_index::{IndexConfig, LoadOutcome, MemorySource, Particle, SpatialBitmapIndex};
use parcel_select::{Aabb3, Axis, Selector};

fn main() {
    // Two files that stay apart and one that straddles both.
    let mut source = MemorySource::new();
    let left = source.push_file(
        "gas",
        vec![
            Particle::new(DVec3::new(-3.0, 0.0, 0.0), 0.2),
            Particle::new(DVec3::new(-2.5, 1.0, 0.0), 0.2),
        ],
    );
    let right = source.push_file(
        "gas",
        vec![
            Particle::new(DVec3::new(3.0, 0.0, 0.0), 0.2),
            Particle::new(DVec3::new(2.5, -1.0, 0.0), 0.2),
        ],
    );
    let middle = source.push_file(
        "gas",
        vec![
            Particle::new(DVec3::new(-2.9, 0.1, 0.0), 0.2),
            Particle::new(DVec3::new(0.0, 0.0, 0.0), 0.2),
        ],
    );

    let domain = Aabb3::new(DVec3::splat(-4.0), DVec3::splat(4.0));
    let config = IndexConfig::default().with_orders(2, 3);
    let index = SpatialBitmapIndex::build(domain, source.registry(), &source, &config).unwrap();
    println!("{index:?}");
    println!("smallest refined cell: {}", index.smallest_dx());

    let near_left = Selector::sphere(DVec3::new(-3.0, 0.0, 0.0), 0.3).unwrap();
    let res = index.resolve(&near_left, 0);
    println!("sphere near the left file -> {:?}", res.candidates);
    assert!(res.candidates.contains(&left));
    assert!(!res.candidates.contains(&right));

    let slab = Selector::slice(Axis::X, 0.0).unwrap();
    let res = index.resolve(&slab, 1);
    println!(
        "slice x = 0 -> candidates {:?}, ghost-zone files {:?}",
        res.candidates, res.buffers
    );
    assert!(res.candidates.contains(&middle));

    // Persist next to a fake dataset path and load it back.
    let dir = tempfile::tempdir().unwrap();
    let path = config.index_filename(&dir.path().join("snapshot"));
    index.save(&path).unwrap();
    match SpatialBitmapIndex::load(&path, &domain, source.registry(), &config) {
        LoadOutcome::Loaded(loaded) => println!("reloaded {} files", loaded.file_count()),
        LoadOutcome::NotFound => println!("no index at {}", path.display()),
        LoadOutcome::Invalid(err) => println!("rejected index: {err}"),
    }
}
