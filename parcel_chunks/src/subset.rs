// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-file particle containers bound to selection and buffer masks.

use std::sync::Arc;

use glam::DVec3;
use parcel_index::{
    BufferMask, CoordinateSource, DataFile, FileId, IndexError, OwnedCell, SelectionMask,
    SpatialBitmapIndex,
};
use parcel_select::{Aabb3, Selector};

/// A particle handed out by a subset. Candidates still need the exact selector test.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Position of the particle within its file.
    pub index: u64,
    /// Particle position.
    pub position: DVec3,
    /// Particle support radius.
    pub support_radius: f64,
    /// True if the particle was reached only through the ghost-zone buffer.
    pub ghost: bool,
}

/// One data file bound to the masks of a query.
///
/// A subset hands out *candidates*: every particle whose support box reaches a selected
/// coarse cell (or, for ghost candidates, a buffer cell). Candidates are a superset of the
/// selected particles; apply [`Selector::select_particle`] to get the exact answer.
#[derive(Debug)]
pub struct OctreeSubset {
    file: DataFile,
    index: Arc<SpatialBitmapIndex>,
    selector: Arc<Selector>,
    selection: Option<Arc<SelectionMask>>,
    buffer: Option<Arc<BufferMask>>,
    base: Option<Arc<OctreeSubset>>,
}

impl OctreeSubset {
    /// Subset of a candidate file, without ghost zones.
    pub fn selected(
        file: DataFile,
        index: Arc<SpatialBitmapIndex>,
        selector: Arc<Selector>,
        selection: Arc<SelectionMask>,
    ) -> Self {
        Self {
            file,
            index,
            selector,
            selection: Some(selection),
            buffer: None,
            base: None,
        }
    }

    /// Add a ghost-zone buffer to an existing subset, keeping it as the base.
    pub fn with_buffer(base: &Arc<Self>, buffer: Arc<BufferMask>) -> Self {
        Self {
            file: base.file.clone(),
            index: base.index.clone(),
            selector: base.selector.clone(),
            selection: base.selection.clone(),
            buffer: Some(buffer),
            base: Some(base.clone()),
        }
    }

    /// Subset of a file that only holds ghost-zone particles.
    pub fn buffer_only(
        file: DataFile,
        index: Arc<SpatialBitmapIndex>,
        selector: Arc<Selector>,
        buffer: Arc<BufferMask>,
    ) -> Self {
        Self {
            file,
            index,
            selector,
            selection: None,
            buffer: Some(buffer),
            base: None,
        }
    }

    /// Bound data file.
    pub fn file(&self) -> &DataFile {
        &self.file
    }

    /// Id of the bound data file.
    pub fn file_id(&self) -> FileId {
        self.file.id()
    }

    /// Selector of the owning query.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Selection mask; `None` for buffer-only subsets.
    pub fn selection(&self) -> Option<&SelectionMask> {
        self.selection.as_deref()
    }

    /// Buffer mask, if ghost zones are attached.
    pub fn buffer(&self) -> Option<&BufferMask> {
        self.buffer.as_deref()
    }

    /// The selector-only subset this one was derived from.
    pub fn base(&self) -> Option<&Arc<Self>> {
        self.base.as_ref()
    }

    /// Ghost width in coarse cells, zero without a buffer.
    pub fn ghost_width(&self) -> u32 {
        self.buffer.as_ref().map_or(0, |b| b.ghost_width())
    }

    /// True if the file holds no selected particles, only ghosts.
    pub fn is_buffer_only(&self) -> bool {
        self.selection.is_none()
    }

    /// Cells of the selection this file is authoritative for.
    ///
    /// Summing per-cell work over the owned cells of every subset of a query visits
    /// each selected cell exactly once.
    pub fn owned_cells(&self) -> Vec<OwnedCell> {
        match &self.selection {
            Some(selection) => self
                .index
                .owned_cells(&self.selector, selection, self.file.id()),
            None => Vec::new(),
        }
    }

    /// Stream the file's candidate particles through `source`.
    ///
    /// Particles reaching a selected cell come out with `ghost == false`; particles
    /// reaching only buffer cells come out with `ghost == true`; the rest are skipped.
    /// A particle reaches every cell its support box touches, its own cell included, and
    /// the own cell of any selected particle is selected, so no selected particle is
    /// skipped.
    pub fn candidates<'a, S: CoordinateSource + ?Sized>(
        &'a self,
        source: &'a S,
    ) -> Result<impl Iterator<Item = Candidate> + 'a, IndexError> {
        let particles = source
            .particles(&self.file)
            .map_err(|source| IndexError::Source {
                file: self.file.id(),
                source,
            })?;
        let grid = self.index.coarse_grid();
        Ok(particles.zip(0_u64..).filter_map(move |(p, index)| {
            let reach =
                Aabb3::from_center_half_extents(p.position, DVec3::splat(p.support_radius));
            let mut ghost = None;
            for cell in grid.cells_in(&reach) {
                if self.selection.as_ref().is_some_and(|s| s.contains_cell(cell)) {
                    ghost = Some(false);
                    break;
                }
                if self.buffer.as_ref().is_some_and(|b| b.contains_cell(cell)) {
                    ghost = Some(true);
                }
            }
            ghost.map(|ghost| Candidate {
                index,
                position: p.position,
                support_radius: p.support_radius,
                ghost,
            })
        }))
    }
}
