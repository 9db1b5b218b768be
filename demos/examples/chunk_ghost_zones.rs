// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chunking with ghost zones.
//!
//! Resolve a query against the orientation fixture, iterate its chunks in each style,
//! and widen the ghost shell without rebuilding the selector-only subsets.
//!
//! Run:
//! - `cargo run -p parcel_demos --example chunk_ghost_zones`

use std::sync::Arc;

use glam::DVec3;
use parcel_chunks::testing::sph_orientation_dataset;
use parcel_chunks::{ChunkError, ChunkStyle};

fn main() {
    let ds = sph_orientation_dataset().unwrap();
    let mut query = ds.sphere(DVec3::ZERO, 0.5).unwrap();

    for style in [ChunkStyle::All, ChunkStyle::Io] {
        let sizes: Vec<usize> = ds
            .chunks(&mut query, style, 0)
            .unwrap()
            .map(|c| c.len())
            .collect();
        println!("{style} chunks: {sizes:?}");
    }

    let base = query.base_subsets().unwrap().to_vec();
    for ghost_width in [1, 2] {
        println!("ghost width {ghost_width}:");
        for chunk in ds.chunk_spatial(&mut query, ghost_width, false).unwrap() {
            for subset in &chunk {
                let (mut selected, mut ghosts) = (0, 0);
                for c in subset.candidates(ds.source()).unwrap() {
                    if c.ghost {
                        ghosts += 1;
                    } else if subset.selector().select_particle(c.position, c.support_radius) {
                        selected += 1;
                    }
                }
                let reused = subset
                    .base()
                    .is_some_and(|b| base.iter().any(|s| Arc::ptr_eq(s, b)));
                println!(
                    "  {} selected={selected} ghosts={ghosts} buffer_only={} reuses_base={reused}",
                    subset.file().filename(),
                    subset.is_buffer_only(),
                );
            }
        }
    }

    // Ghost zones only exist for spatial chunks.
    match ds.chunks(&mut query, ChunkStyle::Io, 1) {
        Err(err @ ChunkError::UnsupportedGhostZones { .. }) => println!("{err}"),
        other => println!("unexpected: {other:?}"),
    }

    let selection = ds.select(&mut query).unwrap();
    println!("exact selection: {:?}", selection.particles());
}
