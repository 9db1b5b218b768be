// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping selectors to candidate files, buffer files and owned cells.

use parcel_select::Selector;
use tracing::debug;

use crate::bitmap::{SpatialBitmapIndex, slot};
use crate::bitset::BitSet;
use crate::registry::FileId;

/// Files and coarse cells a selector may reach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionMask {
    files: BitSet,
    cells: BitSet,
}

impl SelectionMask {
    /// Candidate files, one bit per registered file.
    pub fn files(&self) -> &BitSet {
        &self.files
    }

    /// Selected coarse cells.
    pub fn cells(&self) -> &BitSet {
        &self.cells
    }

    /// Whether `file` is a candidate.
    pub fn contains_file(&self, file: FileId) -> bool {
        self.files.contains(file.index())
    }

    /// Whether coarse cell `cell` is selected.
    pub fn contains_cell(&self, cell: u64) -> bool {
        self.cells.contains(slot(cell))
    }

    /// Candidate files in registration order.
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.iter_ones().map(FileId::from_index)
    }

    /// True if no file can contribute.
    pub fn is_empty(&self) -> bool {
        !self.files.any()
    }
}

/// Ghost-zone shell around a selection: touched coarse cells within `ghost_width` cells
/// of a selected cell, and the non-candidate files that reach them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferMask {
    ghost_width: u32,
    files: BitSet,
    cells: BitSet,
}

impl BufferMask {
    /// Width of the shell in coarse cells.
    pub fn ghost_width(&self) -> u32 {
        self.ghost_width
    }

    /// Buffer files.
    pub fn files(&self) -> &BitSet {
        &self.files
    }

    /// Buffer cells.
    pub fn cells(&self) -> &BitSet {
        &self.cells
    }

    /// Whether coarse cell `cell` is in the shell.
    pub fn contains_cell(&self, cell: u64) -> bool {
        self.cells.contains(slot(cell))
    }

    /// Buffer files in registration order.
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.iter_ones().map(FileId::from_index)
    }
}

/// Result of resolving a selector against the index.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Files whose particles may satisfy the selector, in registration order.
    pub candidates: Vec<FileId>,
    /// Files needed only for ghost zones. Disjoint from `candidates`.
    pub buffers: Vec<FileId>,
    /// Selected files and cells.
    pub selection: SelectionMask,
    /// Ghost-zone shell, present when a non-zero ghost width was requested.
    pub buffer: Option<BufferMask>,
}

/// A cell in an ownership partition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnedCell {
    /// A whole coarse cell.
    Coarse(u64),
    /// A refined sub-cell of a collision cell.
    Refined(u64),
}

impl SpatialBitmapIndex {
    /// Resolve `selector` into candidate files and, for `ghost_width > 0`, buffer files.
    ///
    /// Sound: every file holding a particle that `selector` selects is a candidate.
    pub fn resolve(&self, selector: &Selector, ghost_width: u32) -> Resolution {
        let selection = self.selection_mask(selector);
        let candidates: Vec<FileId> = selection.file_ids().collect();
        let buffer = (ghost_width > 0).then(|| self.ghost_zones(&selection, ghost_width));
        let buffers: Vec<FileId> = buffer
            .as_ref()
            .map(|b| b.file_ids().collect())
            .unwrap_or_default();
        debug!(
            candidates = candidates.len(),
            buffers = buffers.len(),
            cells = selection.cells.count_ones(),
            ghost_width,
            "resolved selector"
        );
        Resolution {
            candidates,
            buffers,
            selection,
            buffer,
        }
    }

    /// Coarse cells and files that `selector` may reach.
    ///
    /// A touched coarse cell is selected when the selector may intersect its box padded
    /// by the largest support radius on every face. The padded box of a particle's own
    /// cell holds its whole support sphere, so every child of an `And` that reaches the
    /// sphere also reaches that one box. Files in non-collision cells are taken directly;
    /// in collision cells a file is taken only if one of its refined sub-cells passes the
    /// same test.
    pub fn selection_mask(&self, selector: &Selector) -> SelectionMask {
        let pad = self.max_support_radius;
        let ncoarse = self.touched.len();
        let mut cells = BitSet::new(ncoarse);
        let mut files = BitSet::new(self.file_count());
        let search = selector.reach(pad);
        for c in self.coarse_grid.cells_in(&search) {
            let s = slot(c);
            if !self.touched.contains(s)
                || !selector.may_intersect(&self.coarse_grid.padded_cell_box(c, pad))
            {
                continue;
            }
            cells.insert(s);
            let refine = self.is_refined() && self.collisions.contains(s);
            for (f, bits) in self.coarse.iter().enumerate() {
                if !bits.contains(s) || files.contains(f) {
                    continue;
                }
                if !refine || self.refined_hit(f, c, selector) {
                    files.insert(f);
                }
            }
        }
        SelectionMask { files, cells }
    }

    fn refined_hit(&self, file: usize, coarse: u64, selector: &Selector) -> bool {
        let shift = self.refined_shift();
        let pad = self.max_support_radius;
        self.refined[file]
            .range(coarse << shift..(coarse + 1) << shift)
            .any(|&r| selector.may_intersect(&self.refined_grid.padded_cell_box(r, pad)))
    }

    /// The ghost-zone shell of `selection`, `ghost_width` coarse cells wide.
    ///
    /// Buffer cells are touched cells within `ghost_width` of a selected cell that are not
    /// selected themselves; buffer files are non-candidate files reaching a buffer cell.
    pub fn ghost_zones(&self, selection: &SelectionMask, ghost_width: u32) -> BufferMask {
        let mut cells = BitSet::new(self.touched.len());
        if ghost_width > 0 {
            for s in selection.cells.iter_ones() {
                for n in self.coarse_grid.neighborhood(s as u64, ghost_width) {
                    let ns = slot(n);
                    if self.touched.contains(ns) && !selection.cells.contains(ns) {
                        cells.insert(ns);
                    }
                }
            }
        }
        let mut files = BitSet::new(self.file_count());
        for (f, bits) in self.coarse.iter().enumerate() {
            if !selection.files.contains(f) && !bits.is_disjoint(&cells) {
                files.insert(f);
            }
        }
        BufferMask {
            ghost_width,
            files,
            cells,
        }
    }

    /// Cells of `selection` owned by `file`.
    ///
    /// Non-collision cells are owned whole by their only file. Inside collision cells the
    /// refined sub-cells that pass the selector test are owned by their first registered
    /// file (or, without refinement, the whole cell goes to the coarse owner). Over all
    /// files the result partitions the selection, so per-cell reductions summed across
    /// files count every cell once.
    pub fn owned_cells(
        &self,
        selector: &Selector,
        selection: &SelectionMask,
        file: FileId,
    ) -> Vec<OwnedCell> {
        let shift = self.refined_shift();
        let pad = self.max_support_radius;
        let mut out = Vec::new();
        for s in selection.cells.iter_ones() {
            let c = s as u64;
            if self.is_refined() && self.collisions.contains(s) {
                out.extend(
                    self.refined_owner
                        .range(c << shift..(c + 1) << shift)
                        .filter(|&(&r, &owner)| {
                            owner == file
                                && selector
                                    .may_intersect(&self.refined_grid.padded_cell_box(r, pad))
                        })
                        .map(|(&r, _)| OwnedCell::Refined(r)),
                );
            } else if self.coarse_owner(c) == Some(file) {
                out.push(OwnedCell::Coarse(c));
            }
        }
        out
    }
}
