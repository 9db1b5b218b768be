// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query objects and their per-query subset caches.

use std::mem;
use std::sync::Arc;

use parcel_index::{
    BufferMask, DataFileRegistry, FileId, IndexError, SelectionMask, SpatialBitmapIndex,
};
use parcel_select::Selector;
use tracing::debug;

use crate::chunk::Chunk;
use crate::error::Result;
use crate::subset::OctreeSubset;

/// Shared list of subsets.
pub(crate) type Subsets = Arc<[Arc<OctreeSubset>]>;

/// How far a query has been resolved against an index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueryStage {
    /// Nothing computed yet.
    Unresolved,
    /// Selection mask and selector-only subsets are cached.
    SelectorResolved,
    /// A ghost-zone buffer of the given width is cached on top of the selector state.
    BufferResolved {
        /// Width of the cached buffer in coarse cells.
        ghost_width: u32,
    },
}

#[derive(Debug)]
struct SelectorState {
    index: Arc<SpatialBitmapIndex>,
    selection: Arc<SelectionMask>,
    subsets: Subsets,
}

#[derive(Debug)]
struct BufferState {
    ghost_width: u32,
    mask: Arc<BufferMask>,
    subsets: Subsets,
}

#[derive(Debug)]
enum QueryState {
    Unresolved,
    SelectorResolved(SelectorState),
    BufferResolved {
        base: SelectorState,
        buffer: BufferState,
    },
}

/// A selector plus everything derived from resolving it.
///
/// The derived state only grows: resolving the selector caches the selection mask and
/// one subset per candidate file; asking for ghost zones adds a buffer on top, built
/// from those same subsets. Asking for a different ghost width replaces the buffer and
/// keeps the selector state. A query resolved against one index is reset when used
/// with another.
#[derive(Debug)]
pub struct Query {
    selector: Arc<Selector>,
    state: QueryState,
    current_chunk: Option<Chunk>,
}

impl Query {
    /// New unresolved query.
    pub fn new(selector: Selector) -> Self {
        Self {
            selector: Arc::new(selector),
            state: QueryState::Unresolved,
            current_chunk: None,
        }
    }

    /// The query's selector.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Current resolution stage.
    pub fn stage(&self) -> QueryStage {
        match &self.state {
            QueryState::Unresolved => QueryStage::Unresolved,
            QueryState::SelectorResolved(_) => QueryStage::SelectorResolved,
            QueryState::BufferResolved { buffer, .. } => QueryStage::BufferResolved {
                ghost_width: buffer.ghost_width,
            },
        }
    }

    /// Cached selection mask.
    pub fn selection_mask(&self) -> Option<&SelectionMask> {
        self.base().map(|b| &*b.selection)
    }

    /// Cached buffer mask.
    pub fn buffer_mask(&self) -> Option<&BufferMask> {
        match &self.state {
            QueryState::BufferResolved { buffer, .. } => Some(&buffer.mask),
            _ => None,
        }
    }

    /// Candidate files of the cached selection.
    pub fn candidate_files(&self) -> Vec<FileId> {
        self.selection_mask()
            .map(|s| s.file_ids().collect())
            .unwrap_or_default()
    }

    /// Buffer files of the cached buffer.
    pub fn buffer_files(&self) -> Vec<FileId> {
        self.buffer_mask()
            .map(|b| b.file_ids().collect())
            .unwrap_or_default()
    }

    /// Cached selector-only subsets.
    pub fn base_subsets(&self) -> Option<&[Arc<OctreeSubset>]> {
        self.base().map(|b| &*b.subsets)
    }

    /// Cached buffer-bearing subsets.
    pub fn buffer_subsets(&self) -> Option<&[Arc<OctreeSubset>]> {
        match &self.state {
            QueryState::BufferResolved { buffer, .. } => Some(&buffer.subsets),
            _ => None,
        }
    }

    /// The most recently produced chunk.
    pub fn current_chunk(&self) -> Option<&Chunk> {
        self.current_chunk.as_ref()
    }

    pub(crate) fn set_current_chunk(&mut self, chunk: Chunk) {
        self.current_chunk = Some(chunk);
    }

    /// Drop all derived state.
    pub fn reset(&mut self) {
        self.state = QueryState::Unresolved;
        self.current_chunk = None;
    }

    fn base(&self) -> Option<&SelectorState> {
        match &self.state {
            QueryState::Unresolved => None,
            QueryState::SelectorResolved(base) | QueryState::BufferResolved { base, .. } => {
                Some(base)
            }
        }
    }

    /// Selector-only subsets, resolving the selector if needed.
    pub(crate) fn resolve_selector(
        &mut self,
        index: &Arc<SpatialBitmapIndex>,
        registry: &DataFileRegistry,
    ) -> Result<Subsets> {
        if let Some(base) = self.base().filter(|b| Arc::ptr_eq(&b.index, index)) {
            return Ok(base.subsets.clone());
        }
        let base = self.take_base(index, registry)?;
        let subsets = base.subsets.clone();
        self.state = QueryState::SelectorResolved(base);
        Ok(subsets)
    }

    /// Buffer-bearing subsets for `ghost_width`, reusing the cached buffer when the
    /// width matches and the selector-only subsets otherwise.
    pub(crate) fn resolve_buffer(
        &mut self,
        index: &Arc<SpatialBitmapIndex>,
        registry: &DataFileRegistry,
        ghost_width: u32,
    ) -> Result<Subsets> {
        match &self.state {
            QueryState::BufferResolved { base, buffer }
                if buffer.ghost_width == ghost_width && Arc::ptr_eq(&base.index, index) =>
            {
                return Ok(buffer.subsets.clone());
            }
            _ => {}
        }
        let base = self.take_base(index, registry)?;
        match build_buffer(&base, registry, &self.selector, ghost_width) {
            Ok(buffer) => {
                let subsets = buffer.subsets.clone();
                self.state = QueryState::BufferResolved { base, buffer };
                Ok(subsets)
            }
            Err(e) => {
                self.state = QueryState::SelectorResolved(base);
                Err(e)
            }
        }
    }

    /// Move the selector state out, leaving the query unresolved. The cached state is
    /// reused if it was resolved against `index`, otherwise the selector is resolved anew.
    fn take_base(
        &mut self,
        index: &Arc<SpatialBitmapIndex>,
        registry: &DataFileRegistry,
    ) -> Result<SelectorState> {
        match mem::replace(&mut self.state, QueryState::Unresolved) {
            QueryState::SelectorResolved(base) | QueryState::BufferResolved { base, .. }
                if Arc::ptr_eq(&base.index, index) =>
            {
                Ok(base)
            }
            QueryState::Unresolved => resolve_selection(index, registry, &self.selector),
            QueryState::SelectorResolved(_) | QueryState::BufferResolved { .. } => {
                debug!("index changed, resetting query");
                self.current_chunk = None;
                resolve_selection(index, registry, &self.selector)
            }
        }
    }
}

fn resolve_selection(
    index: &Arc<SpatialBitmapIndex>,
    registry: &DataFileRegistry,
    selector: &Arc<Selector>,
) -> Result<SelectorState> {
    let selection = Arc::new(index.selection_mask(selector));
    let subsets = selection
        .file_ids()
        .map(|id| {
            let file = registry.get(id).ok_or(IndexError::UnknownFile(id))?;
            Ok(Arc::new(OctreeSubset::selected(
                file.clone(),
                index.clone(),
                selector.clone(),
                selection.clone(),
            )))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(subsets = subsets.len(), "selector resolved");
    Ok(SelectorState {
        index: index.clone(),
        selection,
        subsets: subsets.into(),
    })
}

fn build_buffer(
    base: &SelectorState,
    registry: &DataFileRegistry,
    selector: &Arc<Selector>,
    ghost_width: u32,
) -> Result<BufferState> {
    let mask = Arc::new(base.index.ghost_zones(&base.selection, ghost_width));
    let mut subsets: Vec<Arc<OctreeSubset>> = base
        .subsets
        .iter()
        .map(|s| Arc::new(OctreeSubset::with_buffer(s, mask.clone())))
        .collect();
    for id in mask.file_ids() {
        let file = registry.get(id).ok_or(IndexError::UnknownFile(id))?;
        subsets.push(Arc::new(OctreeSubset::buffer_only(
            file.clone(),
            base.index.clone(),
            selector.clone(),
            mask.clone(),
        )));
    }
    debug!(
        ghost_width,
        buffer_files = subsets.len() - base.subsets.len(),
        "buffer resolved"
    );
    Ok(BufferState {
        ghost_width,
        mask,
        subsets: subsets.into(),
    })
}
