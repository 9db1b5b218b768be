// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform Morton-ordered cell grid over the domain.

use glam::DVec3;
use parcel_select::Aabb3;

use crate::morton;

/// A `2^order` cells-per-axis grid over a domain box, addressed by Morton id.
#[derive(Clone, Debug, PartialEq)]
pub struct CellGrid {
    domain: Aabb3,
    order: u8,
    dims: u32,
    cell_size: DVec3,
}

impl CellGrid {
    /// Grid of `2^order` cells per axis. `order` must be at most 21.
    pub fn new(domain: Aabb3, order: u8) -> Self {
        debug_assert!(order <= 21, "grid order {order} exceeds Morton width");
        let dims = 1_u32 << order;
        Self {
            domain,
            order,
            dims,
            cell_size: domain.size() / f64::from(dims),
        }
    }

    /// Domain covered by the grid.
    pub fn domain(&self) -> &Aabb3 {
        &self.domain
    }

    /// Grid order.
    pub fn order(&self) -> u8 {
        self.order
    }

    /// Cells along each axis.
    pub fn cells_per_axis(&self) -> u32 {
        self.dims
    }

    /// Total number of cells, `8^order`.
    pub fn cell_count(&self) -> u64 {
        1_u64 << (3 * u32::from(self.order))
    }

    /// Edge lengths of one cell.
    pub fn cell_size(&self) -> DVec3 {
        self.cell_size
    }

    /// Integer coordinates of the cell containing `p`, clamped into the grid.
    ///
    /// Points on an interior cell face belong to the upper cell; points on the domain's
    /// upper face belong to the last cell.
    pub fn coords_of(&self, p: DVec3) -> [u32; 3] {
        let t = ((p - self.domain.min) / self.cell_size).floor();
        let top = f64::from(self.dims - 1);
        let c = t.clamp(DVec3::ZERO, DVec3::splat(top));
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Clamped to [0, dims - 1] above."
        )]
        let coords = [c.x as u32, c.y as u32, c.z as u32];
        coords
    }

    /// Morton id of the cell containing `p`.
    pub fn cell_of(&self, p: DVec3) -> u64 {
        let [x, y, z] = self.coords_of(p);
        morton::encode(x, y, z)
    }

    /// Inclusive coordinate range of cells overlapping `aabb`, or `None` if `aabb` misses
    /// the domain.
    pub fn coord_range(&self, aabb: &Aabb3) -> Option<([u32; 3], [u32; 3])> {
        let clipped = aabb.intersect(&self.domain);
        if clipped.is_empty() || !clipped.min.is_finite() || !clipped.max.is_finite() {
            return None;
        }
        Some((self.coords_of(clipped.min), self.coords_of(clipped.max)))
    }

    /// Morton ids of every cell overlapping `aabb`.
    pub fn cells_in(&self, aabb: &Aabb3) -> impl Iterator<Item = u64> + use<> {
        self.coord_range(aabb)
            .into_iter()
            .flat_map(|(lo, hi)| cells_between(lo, hi))
    }

    /// Cells within `width` cells of `id` along every axis, `id` included.
    pub fn neighborhood(&self, id: u64, width: u32) -> impl Iterator<Item = u64> + use<> {
        let c = morton::decode(id);
        let top = self.dims - 1;
        let lo = c.map(|v| v.saturating_sub(width));
        let hi = c.map(|v| v.saturating_add(width).min(top));
        cells_between(lo, hi)
    }

    /// Closed box of cell `id`.
    pub fn cell_box(&self, id: u64) -> Aabb3 {
        let [x, y, z] = morton::decode(id);
        let lo = DVec3::new(f64::from(x), f64::from(y), f64::from(z));
        Aabb3::new(
            self.domain.min + lo * self.cell_size,
            self.domain.min + (lo + DVec3::ONE) * self.cell_size,
        )
    }

    /// Box of cell `id`, grown by `pad` on every face.
    ///
    /// With `pad` at least the largest support radius, the padded box of the cell holding
    /// a particle's centre contains the particle's whole support sphere, including any
    /// overhang past the domain boundary.
    pub fn padded_cell_box(&self, id: u64, pad: f64) -> Aabb3 {
        let b = self.cell_box(id);
        if pad <= 0.0 { b } else { b.expand(pad) }
    }
}

fn cells_between(lo: [u32; 3], hi: [u32; 3]) -> impl Iterator<Item = u64> {
    (lo[2]..=hi[2]).flat_map(move |z| {
        (lo[1]..=hi[1])
            .flat_map(move |y| (lo[0]..=hi[0]).map(move |x| morton::encode(x, y, z)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(order: u8) -> CellGrid {
        CellGrid::new(
            Aabb3::new(DVec3::splat(-4.0), DVec3::splat(4.0)),
            order,
        )
    }

    #[test]
    fn points_map_to_containing_cells() {
        let g = grid(2);
        assert_eq!(g.cell_size(), DVec3::splat(2.0));
        assert_eq!(g.coords_of(DVec3::splat(-4.0)), [0, 0, 0]);
        assert_eq!(g.coords_of(DVec3::ZERO), [2, 2, 2]);
        assert_eq!(g.coords_of(DVec3::splat(4.0)), [3, 3, 3]);
        assert_eq!(g.coords_of(DVec3::new(-100.0, 1.9, 3.0)), [0, 2, 3]);
        assert_eq!(g.cell_of(DVec3::new(-3.0, -3.0, -1.0)), morton::encode(0, 0, 1));
    }

    #[test]
    fn cell_box_contains_its_points() {
        let g = grid(3);
        for p in [
            DVec3::new(0.1, -2.3, 3.9),
            DVec3::new(-4.0, 0.0, 1.0),
            DVec3::splat(3.999),
        ] {
            assert!(g.cell_box(g.cell_of(p)).contains_point(p));
        }
    }

    #[test]
    fn cells_in_covers_box_and_clips_to_domain() {
        let g = grid(2);
        let cells: Vec<u64> = g
            .cells_in(&Aabb3::new(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 1.0, 1.0)))
            .collect();
        assert_eq!(cells.len(), 8);
        assert_eq!(g.cells_in(&Aabb3::EVERYWHERE).count(), 64);
        let outside = Aabb3::new(DVec3::splat(5.0), DVec3::splat(6.0));
        assert_eq!(g.cells_in(&outside).count(), 0);
    }

    #[test]
    fn neighborhood_clamps_at_edges() {
        let g = grid(2);
        assert_eq!(g.neighborhood(morton::encode(0, 0, 0), 1).count(), 8);
        assert_eq!(g.neighborhood(morton::encode(1, 1, 1), 1).count(), 27);
        assert_eq!(g.neighborhood(morton::encode(1, 1, 1), 0).count(), 1);
    }

    #[test]
    fn every_face_is_padded() {
        let g = grid(2);
        let corner = g.padded_cell_box(morton::encode(0, 3, 1), 0.5);
        assert_eq!(corner.min, DVec3::new(-4.5, 1.5, -2.5));
        assert_eq!(corner.max, DVec3::new(-1.5, 4.5, 0.5));
        let id = morton::encode(1, 1, 1);
        assert_eq!(g.padded_cell_box(id, 0.0), g.cell_box(id));
    }
}
