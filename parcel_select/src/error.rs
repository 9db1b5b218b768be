// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while constructing selectors.

use thiserror::Error;

/// Invalid selector geometry.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SelectorError {
    /// A radius was negative, NaN, or infinite.
    #[error("radius must be non-negative and finite, got {0}")]
    InvalidRadius(f64),

    /// A disk height was negative, NaN, or infinite.
    #[error("height must be non-negative and finite, got {0}")]
    InvalidHeight(f64),

    /// A normal vector was zero or not finite.
    #[error("normal vector must be non-zero and finite")]
    DegenerateNormal,

    /// Ray start and end coincide.
    #[error("ray start and end coincide")]
    DegenerateRay,

    /// Region left edge exceeds the right edge on some axis.
    #[error("region left edge must not exceed right edge on any axis")]
    InvertedRegion,

    /// A point or coordinate was NaN or infinite.
    #[error("coordinates must be finite")]
    NonFinite,

    /// An axis name other than x, y or z.
    #[error("unknown axis {0:?}, expected one of x, y, z")]
    UnknownAxis(char),
}

/// Result type for selector construction.
pub type Result<T> = core::result::Result<T, SelectorError>;
