// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Largest combined order: three interleaved 21-bit coordinates fill a `u64`.
pub const MAX_TOTAL_ORDER: u8 = 21;

/// Largest coarse order. Coarse occupancy is stored densely, `8^order1` bits per file.
pub const MAX_COARSE_ORDER: u8 = 8;

bitflags! {
    /// Switches for the build protocol.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BuildFlags: u8 {
        /// Skip the refined pass. Collision cells are then owned at coarse resolution.
        const NO_REFINE  = 0b0000_0001;
        /// Do not persist the index after building it.
        const DONT_CACHE = 0b0000_0010;
    }
}

/// Configuration for building or loading a bitmap index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Coarse order: the domain is cut into `2^order1` cells per axis.
    /// Default: 5 (32³ coarse cells).
    pub order1: u8,

    /// Refinement order: each collision cell is cut into `2^order2` sub-cells per axis.
    /// Default: 2.
    pub order2: u8,

    /// Build protocol switches.
    pub flags: BuildFlags,

    /// Explicit index file location. When unset the path is derived from the dataset path.
    pub index_path: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order1: 5,
            order2: 2,
            flags: BuildFlags::empty(),
            index_path: None,
        }
    }
}

impl IndexConfig {
    /// Set both index orders.
    pub fn with_orders(mut self, order1: u8, order2: u8) -> Self {
        self.order1 = order1;
        self.order2 = order2;
        self
    }

    /// Set build flags.
    pub fn with_flags(mut self, flags: BuildFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Use an explicit index file.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Check the orders fit in a 64-bit Morton code and the coarse level stays dense-storable.
    pub fn validate(&self) -> Result<()> {
        if self.order1 == 0
            || self.order1 > MAX_COARSE_ORDER
            || self.order1.saturating_add(self.order2) > MAX_TOTAL_ORDER
        {
            return Err(IndexError::InvalidOrder {
                order1: self.order1,
                order2: self.order2,
            });
        }
        Ok(())
    }

    /// Index file for a dataset: the explicit path, or `<dataset>.index<o1>_<o2>.pbmi`.
    pub fn index_filename(&self, dataset_path: &Path) -> PathBuf {
        if let Some(path) = &self.index_path {
            return path.clone();
        }
        let mut name = OsString::from(dataset_path.as_os_str());
        name.push(format!(".index{}_{}.pbmi", self.order1, self.order2));
        PathBuf::from(name)
    }
}
