// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for chunk iteration.

use parcel_index::IndexError;
use parcel_select::SelectorError;
use thiserror::Error;

use crate::chunk::ChunkStyle;

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    /// Ghost zones were requested from a chunking style that does not carry them.
    ///
    /// This is a usage error: only [`ChunkStyle::Spatial`] supports ghost zones.
    #[error("{style} chunking does not support ghost zones (requested width {ghost_width})")]
    UnsupportedGhostZones {
        /// Style that was requested.
        style: ChunkStyle,
        /// Requested ghost width.
        ghost_width: u32,
    },

    /// Building, loading or querying the bitmap index failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A selector could not be constructed.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Result type for chunking operations.
pub type Result<T> = std::result::Result<T, ChunkError>;
