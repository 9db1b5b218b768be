// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parcel Chunks: chunked, ghost-zone aware access to particle datasets.
//!
//! A [`ParticleIndex`] ties together a dataset's files, the
//! [`CoordinateSource`](parcel_index::CoordinateSource) that reads them, and the
//! [`SpatialBitmapIndex`](parcel_index::SpatialBitmapIndex) built over them. Queries are
//! [`Query`] objects wrapping a [`Selector`](parcel_select::Selector); asking for chunks
//! resolves the selector to candidate files once and caches one [`OctreeSubset`] per file
//! on the query.
//!
//! - [`ChunkStyle::All`]: one chunk with every subset.
//! - [`ChunkStyle::Spatial`]: one chunk per subset, optionally with ghost zones. Changing
//!   the ghost width rebuilds only the buffer, on top of the cached subsets.
//! - [`ChunkStyle::Io`]: one chunk per subset, for streaming reads.
//!
//! Subsets hand out candidate particles; the exact smoothing-aware test is up to the
//! consumer. [`ParticleIndex::select`] does both and returns the selected particles.
//!
//! # Example
//!
//! ```rust
//! use glam::DVec3;
//! use parcel_chunks::{ChunkStyle, testing::sph_orientation_dataset};
//!
//! let ds = sph_orientation_dataset().unwrap();
//! let mut query = ds.sphere(DVec3::ZERO, 1.0).unwrap();
//!
//! // The origin and its three unit neighbours, through their support radius.
//! assert_eq!(ds.select(&mut query).unwrap().len(), 4);
//!
//! // One chunk per candidate file, each with a ghost shell one coarse cell wide.
//! for chunk in ds.chunks(&mut query, ChunkStyle::Spatial, 1).unwrap() {
//!     for subset in &chunk {
//!         let ghosts = subset
//!             .candidates(ds.source())
//!             .unwrap()
//!             .filter(|c| c.ghost)
//!             .count();
//!         println!("{}: {ghosts} ghost candidates", subset.file().filename());
//!     }
//! }
//! ```
//!
//! Enable the `rayon` feature to scan files in parallel while building the index.

pub mod cache;
pub mod chunk;
pub mod error;
pub mod particle_index;
pub mod query;
pub mod selection;
pub mod subset;
pub mod testing;

pub use cache::{IndexCache, IndexKey};
pub use chunk::{Chunk, ChunkIter, ChunkStyle};
pub use error::{ChunkError, Result};
pub use particle_index::ParticleIndex;
pub use query::{Query, QueryStage};
pub use selection::{ParticleRef, Selection};
pub use subset::{Candidate, OctreeSubset};
