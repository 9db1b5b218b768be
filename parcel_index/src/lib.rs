// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parcel Index: a two-level spatial bitmap index over particle data files.
//!
//! Particle datasets are split across many files. Before reading anything, a query needs
//! to know which files can hold particles it selects. [`SpatialBitmapIndex`] answers that
//! by recording, per file, which cells of a Morton-ordered grid over the domain the file's
//! particles reach.
//!
//! - The coarse level has `2^order1` cells per axis. A cell reached by two or more files
//!   is a *collision*.
//! - Inside collision cells, a refined level of `2^order2` sub-cells per axis separates
//!   files that merely share a coarse cell.
//! - Every touched cell has one owner (the first registered file reaching it), so
//!   per-cell work can be split across files without double counting.
//!
//! Particles reach every cell overlapped by the box around their support sphere, so a
//! smoothing-aware [`Selector`](parcel_select::Selector) never misses a file.
//!
//! # Example
//!
//! ```rust
//! use glam::DVec3;
//! use parcel_index::{IndexConfig, MemorySource, Particle, SpatialBitmapIndex};
//! use parcel_select::{Aabb3, Selector};
//!
//! let mut source = MemorySource::new();
//! let near = source.push_file("gas", vec![Particle::new(DVec3::new(-3.0, -3.0, -3.0), 0.1)]);
//! let _far = source.push_file("gas", vec![Particle::new(DVec3::new(3.0, 3.0, 3.0), 0.1)]);
//!
//! let domain = Aabb3::new(DVec3::splat(-4.0), DVec3::splat(4.0));
//! let config = IndexConfig::default().with_orders(3, 2);
//! let index = SpatialBitmapIndex::build(domain, source.registry(), &source, &config).unwrap();
//!
//! let query = Selector::sphere(DVec3::new(-3.0, -3.0, -3.0), 0.5).unwrap();
//! assert_eq!(index.resolve(&query, 0).candidates, vec![near]);
//! ```
//!
//! Indexes persist next to the dataset with [`SpatialBitmapIndex::load_or_build`]; a
//! missing, corrupt or mismatched index file is rebuilt.
//!
//! Enable the `rayon` feature to scan files in parallel during the build.

pub mod bitmap;
pub mod bitset;
pub mod config;
pub mod error;
pub mod grid;
pub mod morton;
pub mod persist;
pub mod registry;
pub mod resolve;

pub use bitmap::SpatialBitmapIndex;
pub use bitset::BitSet;
pub use config::{BuildFlags, IndexConfig, MAX_COARSE_ORDER, MAX_TOTAL_ORDER};
pub use error::{IndexError, Result};
pub use grid::CellGrid;
pub use persist::LoadOutcome;
pub use registry::{
    CoordinateSource, DataFile, DataFileRegistry, FileId, MemorySource, Particle, SourceError,
};
pub use resolve::{BufferMask, OwnedCell, Resolution, SelectionMask};
