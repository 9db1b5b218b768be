// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the bitmap index.

use thiserror::Error;

use crate::registry::{FileId, SourceError};

/// Bitmap index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// IO error during index read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload (de)serialization error.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),

    /// Persisted index is corrupt, truncated, or from another format version.
    #[error("index format error: {0}")]
    Format(String),

    /// A data file yielded a different number of particles than it declared.
    #[error("file {file}: declared {expected} particles but read {actual}")]
    ParticleCountMismatch {
        /// Offending file.
        file: FileId,
        /// Count from the file descriptor.
        expected: u64,
        /// Count actually iterated.
        actual: u64,
    },

    /// A particle position lies outside the domain bounds.
    #[error("file {file}: particle {particle} at {position:?} lies outside the domain")]
    OutsideDomain {
        /// Offending file.
        file: FileId,
        /// Particle index within the file.
        particle: u64,
        /// Offending position.
        position: [f64; 3],
    },

    /// A particle support radius is negative or not finite.
    #[error("file {file}: particle {particle} has invalid support radius {radius}")]
    InvalidSupportRadius {
        /// Offending file.
        file: FileId,
        /// Particle index within the file.
        particle: u64,
        /// Offending radius.
        radius: f64,
    },

    /// Domain bounds are not finite or have zero extent on some axis.
    #[error("invalid domain bounds {min:?}..{max:?}")]
    InvalidDomain {
        /// Minimum corner.
        min: [f64; 3],
        /// Maximum corner.
        max: [f64; 3],
    },

    /// Index orders out of range.
    #[error("invalid index orders ({order1}, {order2}): need 1 <= order1 <= 8 and order1 + order2 <= 21")]
    InvalidOrder {
        /// Coarse order.
        order1: u8,
        /// Refinement order.
        order2: u8,
    },

    /// A file id not present in the registry.
    #[error("unknown data file {0}")]
    UnknownFile(FileId),

    /// The external coordinate source failed.
    #[error("file {file}: coordinate source failed: {source}")]
    Source {
        /// File being read.
        file: FileId,
        /// Underlying error.
        #[source]
        source: SourceError,
    },
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
