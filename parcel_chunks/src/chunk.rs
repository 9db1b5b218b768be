// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chunks: groups of subsets handed to a consumer in one step.

use std::fmt;
use std::sync::Arc;

use crate::subset::OctreeSubset;

/// How the subsets of a query are grouped into chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkStyle {
    /// One chunk holding every subset.
    All,
    /// One chunk per subset, optionally carrying ghost zones.
    Spatial,
    /// One chunk per subset, for streaming reads.
    Io,
}

impl ChunkStyle {
    /// Whether this style can carry ghost zones.
    pub const fn supports_ghost_zones(self) -> bool {
        matches!(self, Self::Spatial)
    }
}

impl fmt::Display for ChunkStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Spatial => "spatial",
            Self::Io => "io",
        })
    }
}

/// One unit of chunked work.
#[derive(Clone, Debug)]
pub struct Chunk {
    style: ChunkStyle,
    subsets: Vec<Arc<OctreeSubset>>,
}

impl Chunk {
    pub(crate) fn new(style: ChunkStyle, subsets: Vec<Arc<OctreeSubset>>) -> Self {
        Self { style, subsets }
    }

    /// Style that produced this chunk.
    pub fn style(&self) -> ChunkStyle {
        self.style
    }

    /// Subsets in this chunk.
    pub fn subsets(&self) -> &[Arc<OctreeSubset>] {
        &self.subsets
    }

    /// Number of subsets.
    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    /// True if the chunk holds no subsets.
    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    /// Iterate over the subsets.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<OctreeSubset>> + '_ {
        self.subsets.iter()
    }
}

impl<'a> IntoIterator for &'a Chunk {
    type Item = &'a Arc<OctreeSubset>;
    type IntoIter = std::slice::Iter<'a, Arc<OctreeSubset>>;

    fn into_iter(self) -> Self::IntoIter {
        self.subsets.iter()
    }
}

/// Iterator over the chunks of a query.
///
/// Cloning is cheap: the subsets are shared, only the cursor is copied.
#[derive(Clone, Debug)]
pub struct ChunkIter {
    style: ChunkStyle,
    subsets: Arc<[Arc<OctreeSubset>]>,
    pos: usize,
}

impl ChunkIter {
    pub(crate) fn new(style: ChunkStyle, subsets: Arc<[Arc<OctreeSubset>]>) -> Self {
        Self {
            style,
            subsets,
            pos: 0,
        }
    }

    /// Style of the chunks produced.
    pub fn style(&self) -> ChunkStyle {
        self.style
    }

    fn total(&self) -> usize {
        match self.style {
            // An empty selection yields no chunk at all.
            ChunkStyle::All => usize::from(!self.subsets.is_empty()),
            ChunkStyle::Spatial | ChunkStyle::Io => self.subsets.len(),
        }
    }
}

impl Iterator for ChunkIter {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.pos >= self.total() {
            return None;
        }
        let subsets = match self.style {
            ChunkStyle::All => self.subsets.to_vec(),
            ChunkStyle::Spatial | ChunkStyle::Io => vec![self.subsets[self.pos].clone()],
        };
        self.pos += 1;
        Some(Chunk::new(self.style, subsets))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.total().saturating_sub(self.pos);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkIter {}

impl std::iter::FusedIterator for ChunkIter {}
