// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The two-level spatial bitmap index and its build passes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use parcel_select::Aabb3;
use tracing::{debug, info, info_span};

use crate::bitset::BitSet;
use crate::config::{BuildFlags, IndexConfig};
use crate::error::{IndexError, Result};
use crate::grid::CellGrid;
use crate::registry::{CoordinateSource, DataFile, DataFileRegistry, FileId, Particle};

/// Per-file occupancy of a two-level Morton grid over the domain.
///
/// The coarse level records, for every file, which of the `8^order1` cells its particles
/// reach (a particle reaches every cell overlapped by the bounding box of its support
/// sphere). A coarse cell reached by two or more files is a *collision*; inside those,
/// the refined level records per-file occupancy at `order1 + order2`.
///
/// Each touched cell has exactly one owner: the first registered file that reaches it,
/// decided at refined resolution inside collision cells and at coarse resolution
/// elsewhere.
pub struct SpatialBitmapIndex {
    pub(crate) domain: Aabb3,
    pub(crate) order1: u8,
    pub(crate) order2: u8,
    pub(crate) flags: BuildFlags,
    pub(crate) total_particles: u64,
    pub(crate) max_support_radius: f64,
    pub(crate) coarse: Vec<BitSet>,
    pub(crate) collisions: BitSet,
    pub(crate) refined: Vec<BTreeSet<u64>>,
    pub(crate) coarse_owner: BTreeMap<u64, FileId>,
    pub(crate) refined_owner: BTreeMap<u64, FileId>,
    // Derived on construction, never persisted.
    pub(crate) touched: BitSet,
    pub(crate) coarse_grid: CellGrid,
    pub(crate) refined_grid: CellGrid,
}

impl fmt::Debug for SpatialBitmapIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialBitmapIndex")
            .field("domain", &self.domain)
            .field("order1", &self.order1)
            .field("order2", &self.order2)
            .field("flags", &self.flags)
            .field("files", &self.coarse.len())
            .field("total_particles", &self.total_particles)
            .field("touched_cells", &self.touched.count_ones())
            .field("collisions", &self.collisions.count_ones())
            .finish_non_exhaustive()
    }
}

/// Bit position of a coarse cell id. Coarse grids are capped well below `usize` range.
#[inline]
pub(crate) fn slot(cell: u64) -> usize {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Coarse cell ids are below 8^MAX_COARSE_ORDER."
    )]
    let s = cell as usize;
    s
}

/// Bounding box of a particle's support sphere.
fn support_box(p: &Particle) -> Aabb3 {
    Aabb3::from_center_half_extents(p.position, glam::DVec3::splat(p.support_radius))
}

fn read_file<'a, S: CoordinateSource + ?Sized>(
    source: &'a S,
    file: &DataFile,
) -> Result<Box<dyn Iterator<Item = Particle> + 'a>> {
    source.particles(file).map_err(|source| IndexError::Source {
        file: file.id(),
        source,
    })
}

fn check_count(file: &DataFile, actual: u64) -> Result<()> {
    let expected = file.total_particles();
    if expected != actual {
        return Err(IndexError::ParticleCountMismatch {
            file: file.id(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_particle(domain: &Aabb3, file: &DataFile, particle: u64, p: &Particle) -> Result<()> {
    if !domain.contains_point(p.position) {
        return Err(IndexError::OutsideDomain {
            file: file.id(),
            particle,
            position: p.position.to_array(),
        });
    }
    if !(p.support_radius.is_finite() && p.support_radius >= 0.0) {
        return Err(IndexError::InvalidSupportRadius {
            file: file.id(),
            particle,
            radius: p.support_radius,
        });
    }
    Ok(())
}

struct CoarseScan {
    cells: BitSet,
    max_support_radius: f64,
}

fn scan_coarse<S: CoordinateSource + ?Sized>(
    grid: &CellGrid,
    file: &DataFile,
    source: &S,
) -> Result<CoarseScan> {
    let mut cells = BitSet::new(slot(grid.cell_count()));
    let mut max_support_radius = 0.0_f64;
    let mut count = 0_u64;
    for p in read_file(source, file)? {
        check_particle(grid.domain(), file, count, &p)?;
        for c in grid.cells_in(&support_box(&p)) {
            cells.insert(slot(c));
        }
        max_support_radius = max_support_radius.max(p.support_radius);
        count += 1;
    }
    check_count(file, count)?;
    debug!(
        file = %file.id(),
        particles = count,
        cells = cells.count_ones(),
        "coarse scan"
    );
    Ok(CoarseScan {
        cells,
        max_support_radius,
    })
}

fn scan_refined<S: CoordinateSource + ?Sized>(
    coarse_grid: &CellGrid,
    refined_grid: &CellGrid,
    shift: u32,
    collisions: &BitSet,
    file: &DataFile,
    source: &S,
) -> Result<BTreeSet<u64>> {
    let mut cells = BTreeSet::new();
    let mut count = 0_u64;
    for p in read_file(source, file)? {
        count += 1;
        let b = support_box(&p);
        if !coarse_grid
            .cells_in(&b)
            .any(|c| collisions.contains(slot(c)))
        {
            continue;
        }
        cells.extend(
            refined_grid
                .cells_in(&b)
                .filter(|r| collisions.contains(slot(r >> shift))),
        );
    }
    check_count(file, count)?;
    debug!(file = %file.id(), cells = cells.len(), "refined scan");
    Ok(cells)
}

impl SpatialBitmapIndex {
    /// Build the index by streaming every file of `registry` through `source`.
    ///
    /// Runs the coarse pass, then (unless [`BuildFlags::NO_REFINE`] is set) the refined
    /// pass over collision cells, then assigns owners. Files are read once per pass.
    ///
    /// Fails if a file yields a different number of particles than it declares, if a
    /// particle lies outside `domain`, or if the source fails.
    pub fn build<S: CoordinateSource + ?Sized>(
        domain: Aabb3,
        registry: &DataFileRegistry,
        source: &S,
        config: &IndexConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_domain(&domain)?;
        let _span = info_span!("bitmap_index_build", files = registry.len()).entered();
        info!(
            particles = registry.total_particles(),
            order1 = config.order1,
            order2 = config.order2,
            "building bitmap index"
        );

        let coarse_grid = CellGrid::new(domain, config.order1);
        let refined_grid = CellGrid::new(domain, config.order1 + config.order2);
        let ncoarse = slot(coarse_grid.cell_count());

        let scans = {
            let _span = info_span!("coarse_pass").entered();
            for_each_file(registry, |file| scan_coarse(&coarse_grid, file, source))?
        };
        let mut touched = BitSet::new(ncoarse);
        let mut collisions = BitSet::new(ncoarse);
        let mut max_support_radius = 0.0_f64;
        let mut coarse = Vec::with_capacity(scans.len());
        for scan in scans {
            touched.accumulate(&scan.cells, &mut collisions);
            max_support_radius = max_support_radius.max(scan.max_support_radius);
            coarse.push(scan.cells);
        }

        let shift = 3 * u32::from(config.order2);
        let refined = if config.flags.contains(BuildFlags::NO_REFINE) || !collisions.any() {
            vec![BTreeSet::new(); registry.len()]
        } else {
            let _span = info_span!("refined_pass", collisions = collisions.count_ones()).entered();
            for_each_file(registry, |file| {
                scan_refined(&coarse_grid, &refined_grid, shift, &collisions, file, source)
            })?
        };

        let (coarse_owner, refined_owner) = assign_owners(&coarse, &refined);
        let index = Self {
            domain,
            order1: config.order1,
            order2: config.order2,
            flags: config.flags,
            total_particles: registry.total_particles(),
            max_support_radius,
            coarse,
            collisions,
            refined,
            coarse_owner,
            refined_owner,
            touched,
            coarse_grid,
            refined_grid,
        };
        info!(
            touched = index.touched.count_ones(),
            collisions = index.collisions.count_ones(),
            refined_cells = index.refined_owner.len(),
            "bitmap index built"
        );
        Ok(index)
    }

    /// Reassemble an index from its persisted parts, deriving grids and the touched set.
    pub(crate) fn from_parts(
        domain: Aabb3,
        order1: u8,
        order2: u8,
        flags: BuildFlags,
        total_particles: u64,
        max_support_radius: f64,
        coarse: Vec<BitSet>,
        collisions: BitSet,
        refined: Vec<BTreeSet<u64>>,
        coarse_owner: BTreeMap<u64, FileId>,
        refined_owner: BTreeMap<u64, FileId>,
    ) -> Self {
        let coarse_grid = CellGrid::new(domain, order1);
        let refined_grid = CellGrid::new(domain, order1 + order2);
        let mut touched = BitSet::new(slot(coarse_grid.cell_count()));
        for bits in &coarse {
            touched.union_with(bits);
        }
        Self {
            domain,
            order1,
            order2,
            flags,
            total_particles,
            max_support_radius,
            coarse,
            collisions,
            refined,
            coarse_owner,
            refined_owner,
            touched,
            coarse_grid,
            refined_grid,
        }
    }

    /// Domain covered by the index.
    pub fn domain(&self) -> &Aabb3 {
        &self.domain
    }

    /// Coarse order.
    pub fn order1(&self) -> u8 {
        self.order1
    }

    /// Refinement order.
    pub fn order2(&self) -> u8 {
        self.order2
    }

    /// Flags the index was built with.
    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    /// Whether collision cells carry refined occupancy.
    pub fn is_refined(&self) -> bool {
        !self.flags.contains(BuildFlags::NO_REFINE)
    }

    /// Number of indexed files.
    pub fn file_count(&self) -> usize {
        self.coarse.len()
    }

    /// Particles indexed over all files.
    pub fn total_particles(&self) -> u64 {
        self.total_particles
    }

    /// Largest support radius seen during the build.
    pub fn max_support_radius(&self) -> f64 {
        self.max_support_radius
    }

    /// Coarse grid.
    pub fn coarse_grid(&self) -> &CellGrid {
        &self.coarse_grid
    }

    /// Refined grid (`order1 + order2`).
    pub fn refined_grid(&self) -> &CellGrid {
        &self.refined_grid
    }

    /// Bits dropped when mapping a refined id to its coarse parent.
    pub fn refined_shift(&self) -> u32 {
        3 * u32::from(self.order2)
    }

    /// Coarse cells reached by `file`.
    pub fn coarse_cells(&self, file: FileId) -> Option<&BitSet> {
        self.coarse.get(file.index())
    }

    /// Refined cells reached by `file` inside collision cells.
    pub fn refined_cells(&self, file: FileId) -> Option<&BTreeSet<u64>> {
        self.refined.get(file.index())
    }

    /// Coarse cells reached by two or more files.
    pub fn collisions(&self) -> &BitSet {
        &self.collisions
    }

    /// Coarse cells reached by any file.
    pub fn touched_cells(&self) -> &BitSet {
        &self.touched
    }

    /// Owner of a coarse cell, if any file reaches it.
    pub fn coarse_owner(&self, cell: u64) -> Option<FileId> {
        self.coarse_owner.get(&cell).copied()
    }

    /// Owner of the refined cell `refined`.
    ///
    /// Inside refined collision cells this is the first file reaching that sub-cell;
    /// elsewhere it is the owner of the enclosing coarse cell.
    pub fn owner_of(&self, refined: u64) -> Option<FileId> {
        let parent = refined >> self.refined_shift();
        if self.is_refined() && self.collisions.contains(slot(parent)) {
            self.refined_owner.get(&refined).copied()
        } else {
            self.coarse_owner(parent)
        }
    }

    /// Smallest refined cell edge: the finest spatial resolution the index can resolve.
    pub fn smallest_dx(&self) -> f64 {
        self.refined_grid.cell_size().min_element()
    }
}

pub(crate) fn validate_domain(domain: &Aabb3) -> Result<()> {
    if domain.min.is_finite() && domain.max.is_finite() && domain.min.cmplt(domain.max).all() {
        Ok(())
    } else {
        Err(IndexError::InvalidDomain {
            min: domain.min.to_array(),
            max: domain.max.to_array(),
        })
    }
}

/// Run `scan` over every file in registration order, in parallel when enabled.
#[cfg(feature = "rayon")]
fn for_each_file<T: Send>(
    registry: &DataFileRegistry,
    scan: impl Fn(&DataFile) -> Result<T> + Send + Sync,
) -> Result<Vec<T>> {
    use rayon::prelude::*;
    registry.files().par_iter().map(scan).collect()
}

/// Run `scan` over every file in registration order.
#[cfg(not(feature = "rayon"))]
fn for_each_file<T>(
    registry: &DataFileRegistry,
    scan: impl Fn(&DataFile) -> Result<T>,
) -> Result<Vec<T>> {
    registry.files().iter().map(scan).collect()
}

/// First-registered-wins ownership at coarse and refined resolution.
pub(crate) fn assign_owners(
    coarse: &[BitSet],
    refined: &[BTreeSet<u64>],
) -> (BTreeMap<u64, FileId>, BTreeMap<u64, FileId>) {
    let mut coarse_owner = BTreeMap::new();
    let mut refined_owner = BTreeMap::new();
    for (i, (bits, cells)) in coarse.iter().zip(refined).enumerate() {
        let id = FileId::from_index(i);
        for c in bits.iter_ones() {
            coarse_owner.entry(c as u64).or_insert(id);
        }
        for &r in cells {
            refined_owner.entry(r).or_insert(id);
        }
    }
    (coarse_owner, refined_owner)
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::morton;
    use crate::registry::MemorySource;

    fn domain() -> Aabb3 {
        Aabb3::new(DVec3::splat(-4.0), DVec3::splat(4.0))
    }

    fn p(x: f64, y: f64, z: f64, h: f64) -> Particle {
        Particle::new(DVec3::new(x, y, z), h)
    }

    #[test]
    fn particles_mark_cells_their_support_reaches() {
        let mut src = MemorySource::new();
        let f = src.push_file("gas", vec![p(-1.0, -1.0, -1.0, 0.5)]);
        let cfg = IndexConfig::default().with_orders(2, 1);
        let idx = SpatialBitmapIndex::build(domain(), src.registry(), &src, &cfg).unwrap();
        // Support box [-1.5, -0.5]^3 stays inside the 2-wide cell (1, 1, 1).
        let cells: Vec<usize> = idx.coarse_cells(f).unwrap().iter_ones().collect();
        assert_eq!(cells, vec![slot(morton::encode(1, 1, 1))]);

        let mut src = MemorySource::new();
        let f = src.push_file("gas", vec![p(0.1, 0.1, 0.1, 0.25)]);
        let idx = SpatialBitmapIndex::build(domain(), src.registry(), &src, &cfg).unwrap();
        // Support box crosses the origin planes on every axis.
        assert_eq!(idx.coarse_cells(f).unwrap().count_ones(), 8);
        assert_eq!(idx.max_support_radius(), 0.25);
    }

    #[test]
    fn overlapping_files_collide_and_refine() {
        let mut src = MemorySource::new();
        let a = src.push_file("gas", vec![p(0.5, 0.5, 0.5, 0.0), p(-3.0, -3.0, -3.0, 0.0)]);
        let b = src.push_file("gas", vec![p(1.5, 1.5, 1.5, 0.0)]);
        let cfg = IndexConfig::default().with_orders(2, 2);
        let idx = SpatialBitmapIndex::build(domain(), src.registry(), &src, &cfg).unwrap();
        let shared = slot(morton::encode(2, 2, 2));
        assert_eq!(idx.collisions().iter_ones().collect::<Vec<_>>(), vec![shared]);
        assert_eq!(idx.touched_cells().count_ones(), 2);

        // Refined cells are 0.5 wide: the two particles land in different sub-cells.
        let ra = idx.refined_grid().cell_of(DVec3::splat(0.5));
        let rb = idx.refined_grid().cell_of(DVec3::splat(1.5));
        assert_ne!(ra, rb);
        assert!(idx.refined_cells(a).unwrap().contains(&ra));
        assert!(idx.refined_cells(b).unwrap().contains(&rb));
        assert_eq!(idx.owner_of(ra), Some(a));
        assert_eq!(idx.owner_of(rb), Some(b));
        // Coarse ownership of the shared cell goes to the first registered file.
        assert_eq!(idx.coarse_owner(morton::encode(2, 2, 2)), Some(a));
        // Refined cells in non-collision territory inherit the coarse owner.
        let lone = idx.refined_grid().cell_of(DVec3::splat(-3.0));
        assert_eq!(idx.owner_of(lone), Some(a));
        assert!(idx.refined_cells(a).unwrap().iter().all(|r| {
            idx.collisions().contains(slot(r >> idx.refined_shift()))
        }));
    }

    #[test]
    fn no_refine_skips_refined_pass() {
        let mut src = MemorySource::new();
        let a = src.push_file("gas", vec![p(0.5, 0.5, 0.5, 0.0)]);
        let b = src.push_file("gas", vec![p(1.5, 1.5, 1.5, 0.0)]);
        let cfg = IndexConfig::default()
            .with_orders(2, 2)
            .with_flags(BuildFlags::NO_REFINE);
        let idx = SpatialBitmapIndex::build(domain(), src.registry(), &src, &cfg).unwrap();
        assert!(!idx.is_refined());
        assert!(idx.refined_cells(b).unwrap().is_empty());
        let rb = idx.refined_grid().cell_of(DVec3::splat(1.5));
        assert_eq!(idx.owner_of(rb), Some(a));
    }

    #[test]
    fn count_mismatch_is_fatal() {
        let mut src = MemorySource::new();
        src.push_file("gas", vec![p(0.0, 0.0, 0.0, 0.1)]);
        let mut registry = DataFileRegistry::new();
        registry.push("memory:0", [("gas", 3)]);
        let err = SpatialBitmapIndex::build(domain(), &registry, &src, &IndexConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::ParticleCountMismatch {
                file: FileId(0),
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn particles_outside_domain_are_rejected() {
        let mut src = MemorySource::new();
        src.push_file("gas", vec![p(0.0, 0.0, 0.0, 0.1), p(0.0, 5.0, 0.0, 0.1)]);
        let err = SpatialBitmapIndex::build(domain(), src.registry(), &src, &IndexConfig::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::OutsideDomain { particle: 1, .. }));

        let mut src = MemorySource::new();
        src.push_file("gas", vec![p(0.0, 0.0, 0.0, f64::NAN)]);
        let err = SpatialBitmapIndex::build(domain(), src.registry(), &src, &IndexConfig::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidSupportRadius { particle: 0, .. }));
    }

    #[test]
    fn degenerate_domain_is_rejected() {
        let src = MemorySource::new();
        let flat = Aabb3::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 1.0));
        let err = SpatialBitmapIndex::build(flat, src.registry(), &src, &IndexConfig::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidDomain { .. }));
    }

    #[test]
    fn smallest_dx_is_refined_cell_edge() {
        let src = MemorySource::new();
        let d = Aabb3::new(DVec3::ZERO, DVec3::new(8.0, 16.0, 32.0));
        let cfg = IndexConfig::default().with_orders(2, 1);
        let idx = SpatialBitmapIndex::build(d, src.registry(), &src, &cfg).unwrap();
        assert_eq!(idx.smallest_dx(), 1.0);
        assert_eq!(idx.file_count(), 0);
        assert!(!idx.touched_cells().any());
    }
}
