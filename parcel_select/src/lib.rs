// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parcel Select: smoothing-length aware geometric selectors for particle data.
//!
//! A [`Selector`] is a pure predicate over particles. Each particle is a point `p` with a
//! support (smoothing) radius `h`, and a particle is selected whenever its support sphere
//! touches the selector's region, not only when `p` itself lies inside. Nudging a query
//! by less than `h` therefore does not change which particles it picks up.
//!
//! - Leaf primitives: [`Region`], [`Sphere`], [`Disk`], [`Ray`], [`CuttingPlane`], [`Slice`].
//! - Boolean nodes combine selection results: `&` (intersection), `|` (union),
//!   `^` (symmetric difference), `!` (complement) and `-` (difference).
//! - [`Selector::within`] restricts a selector to an existing selection (chained selection).
//! - [`Selector::may_intersect`] is a conservative box test used by spatial indexes to skip
//!   whole cells or files.
//!
//! # Example
//!
//! ```rust
//! use glam::DVec3;
//! use parcel_select::{Axis, Selector};
//!
//! let h = 0.25;
//! let near_origin = Selector::sphere(DVec3::ZERO, 0.5).unwrap();
//! let mid_plane = Selector::slice(Axis::Z, 0.0).unwrap();
//!
//! // A particle slightly above the plane is still caught by its support sphere.
//! assert!(mid_plane.select_particle(DVec3::new(2.0, 0.0, 0.2), h));
//!
//! // Boolean combinations act on selection results.
//! let ring = mid_plane - near_origin;
//! assert!(!ring.select_particle(DVec3::ZERO, h));
//! assert!(ring.select_particle(DVec3::new(1.0, 0.0, 0.0), h));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod error;
pub mod selector;
pub mod shapes;
pub mod types;

pub use error::{Result, SelectorError};
pub use selector::Selector;
pub use shapes::{CuttingPlane, Disk, Ray, Region, Slice, Sphere};
pub use types::{Aabb3, Axis};
