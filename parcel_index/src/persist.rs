// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index persistence.
//!
//! Layout: `b"PBMI"`, a version byte, the payload length as `u32` LE, the postcard
//! payload, and a CRC-32 of the payload as `u32` LE. Loading never fails hard: a missing
//! or rejected file is reported through [`LoadOutcome`] so callers can rebuild.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glam::DVec3;
use parcel_select::Aabb3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bitmap::{SpatialBitmapIndex, assign_owners, slot, validate_domain};
use crate::bitset::BitSet;
use crate::config::{BuildFlags, IndexConfig};
use crate::error::{IndexError, Result};
use crate::registry::{CoordinateSource, DataFileRegistry, FileId};

/// Magic bytes of a persisted index.
const INDEX_MAGIC: &[u8; 4] = b"PBMI";

/// Current format version.
const INDEX_VERSION: u8 = 1;

/// Magic, version and payload length.
const HEADER_LEN: usize = 9;

/// Trailing CRC-32.
const CHECKSUM_LEN: usize = 4;

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    order1: u8,
    order2: u8,
    flags: BuildFlags,
    file_count: u32,
    total_particles: u64,
    domain_min: [f64; 3],
    domain_max: [f64; 3],
    max_support_radius: f64,
    coarse: Vec<BitSet>,
    collisions: BitSet,
    refined: Vec<Vec<u64>>,
    coarse_owner: Vec<(u64, FileId)>,
    refined_owner: Vec<(u64, FileId)>,
}

/// Result of trying to load a persisted index.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The file was read, validated and matches the dataset.
    Loaded(SpatialBitmapIndex),
    /// No index file exists at the path.
    NotFound,
    /// The file exists but is unreadable, corrupt, or built for something else.
    Invalid(IndexError),
}

fn ensure(cond: bool, what: impl FnOnce() -> String) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(IndexError::Format(what()))
    }
}

impl IndexSnapshot {
    fn into_index(self) -> Result<SpatialBitmapIndex> {
        IndexConfig::default()
            .with_orders(self.order1, self.order2)
            .validate()?;
        let domain = Aabb3::new(
            DVec3::from_array(self.domain_min),
            DVec3::from_array(self.domain_max),
        );
        validate_domain(&domain)?;
        ensure(
            self.max_support_radius.is_finite() && self.max_support_radius >= 0.0,
            || format!("invalid maximum support radius {}", self.max_support_radius),
        )?;

        let nfiles = self.file_count as usize;
        let ncoarse = slot(1_u64 << (3 * u32::from(self.order1)));
        let nrefined = 1_u64 << (3 * u32::from(self.order1 + self.order2));
        let shift = 3 * u32::from(self.order2);

        ensure(self.coarse.len() == nfiles, || {
            format!("{} coarse bitsets for {nfiles} files", self.coarse.len())
        })?;
        for (f, bits) in self.coarse.iter().enumerate() {
            ensure(bits.len() == ncoarse && bits.is_well_formed(), || {
                format!("malformed coarse bitset for file {f}")
            })?;
        }
        ensure(
            self.collisions.len() == ncoarse && self.collisions.is_well_formed(),
            || "malformed collision bitset".to_owned(),
        )?;
        let mut seen = BitSet::new(ncoarse);
        let mut overlap = BitSet::new(ncoarse);
        for bits in &self.coarse {
            seen.accumulate(bits, &mut overlap);
        }
        ensure(overlap == self.collisions, || {
            "collision bitset disagrees with coarse occupancy".to_owned()
        })?;

        ensure(self.refined.len() == nfiles, || {
            format!("{} refined lists for {nfiles} files", self.refined.len())
        })?;
        let unrefined = self.flags.contains(BuildFlags::NO_REFINE);
        let mut refined = Vec::with_capacity(nfiles);
        for (f, ids) in self.refined.into_iter().enumerate() {
            ensure(!unrefined || ids.is_empty(), || {
                format!("refined cells for file {f} in an unrefined index")
            })?;
            ensure(ids.windows(2).all(|w| w[0] < w[1]), || {
                format!("refined cells for file {f} are not sorted")
            })?;
            for &id in &ids {
                let parent = slot(id >> shift);
                ensure(
                    id < nrefined
                        && self.collisions.contains(parent)
                        && self.coarse[f].contains(parent),
                    || format!("refined cell {id} of file {f} lies outside its collision cells"),
                )?;
            }
            refined.push(ids.into_iter().collect::<BTreeSet<u64>>());
        }

        let (coarse_owner, refined_owner) = assign_owners(&self.coarse, &refined);
        ensure(
            coarse_owner.iter().map(|(&c, &f)| (c, f)).eq(self.coarse_owner.iter().copied()),
            || "coarse ownership table is inconsistent".to_owned(),
        )?;
        ensure(
            refined_owner.iter().map(|(&r, &f)| (r, f)).eq(self.refined_owner.iter().copied()),
            || "refined ownership table is inconsistent".to_owned(),
        )?;

        Ok(SpatialBitmapIndex::from_parts(
            domain,
            self.order1,
            self.order2,
            self.flags,
            self.total_particles,
            self.max_support_radius,
            self.coarse,
            self.collisions,
            refined,
            coarse_owner,
            refined_owner,
        ))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

impl SpatialBitmapIndex {
    /// Encode the index in the persisted format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = IndexSnapshot {
            order1: self.order1,
            order2: self.order2,
            flags: self.flags,
            file_count: u32::try_from(self.file_count())
                .map_err(|_| IndexError::Format("too many files to persist".to_owned()))?,
            total_particles: self.total_particles,
            domain_min: self.domain.min.to_array(),
            domain_max: self.domain.max.to_array(),
            max_support_radius: self.max_support_radius,
            coarse: self.coarse.clone(),
            collisions: self.collisions.clone(),
            refined: self
                .refined
                .iter()
                .map(|cells| cells.iter().copied().collect())
                .collect(),
            coarse_owner: self.coarse_owner.iter().map(|(&c, &f)| (c, f)).collect(),
            refined_owner: self.refined_owner.iter().map(|(&r, &f)| (r, f)).collect(),
        };
        let payload = postcard::to_allocvec(&snapshot)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| IndexError::Format("index payload exceeds 4 GiB".to_owned()))?;

        let mut data = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
        data.extend_from_slice(INDEX_MAGIC);
        data.push(INDEX_VERSION);
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);
        data.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        Ok(data)
    }

    /// Decode and structurally validate a persisted index.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(IndexError::Format("data too short for header".to_owned()));
        }
        if &data[0..4] != INDEX_MAGIC {
            return Err(IndexError::Format("invalid magic bytes".to_owned()));
        }
        let version = data[4];
        if version != INDEX_VERSION {
            return Err(IndexError::Format(format!(
                "unsupported version {version} (expected {INDEX_VERSION})"
            )));
        }
        let len = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;
        let end = HEADER_LEN + len;
        if data.len() < end + CHECKSUM_LEN {
            return Err(IndexError::Format("data truncated".to_owned()));
        }
        if data.len() > end + CHECKSUM_LEN {
            return Err(IndexError::Format("trailing bytes after checksum".to_owned()));
        }
        let payload = &data[HEADER_LEN..end];
        let stored = u32::from_le_bytes([data[end], data[end + 1], data[end + 2], data[end + 3]]);
        if crc32fast::hash(payload) != stored {
            return Err(IndexError::Format("checksum mismatch".to_owned()));
        }
        let snapshot: IndexSnapshot = postcard::from_bytes(payload)?;
        snapshot.into_index()
    }

    /// Write the index to `path`, replacing any previous file.
    ///
    /// The bytes go to a sibling temporary file first and are renamed into place.
    /// Concurrent writers of the same path are not supported.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self.to_bytes()?;
        let tmp = temp_path(path);
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), bytes = data.len(), "saved bitmap index");
        Ok(())
    }

    /// Load the index at `path` and check it was built for this dataset and config.
    pub fn load(
        path: &Path,
        domain: &Aabb3,
        registry: &DataFileRegistry,
        config: &IndexConfig,
    ) -> LoadOutcome {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return LoadOutcome::NotFound,
            Err(err) => return LoadOutcome::Invalid(err.into()),
        };
        match Self::from_bytes(&data).and_then(|index| {
            index.check_matches(domain, registry, config)?;
            Ok(index)
        }) {
            Ok(index) => LoadOutcome::Loaded(index),
            Err(err) => LoadOutcome::Invalid(err),
        }
    }

    fn check_matches(
        &self,
        domain: &Aabb3,
        registry: &DataFileRegistry,
        config: &IndexConfig,
    ) -> Result<()> {
        ensure(
            self.order1 == config.order1 && self.order2 == config.order2,
            || {
                format!(
                    "index orders ({}, {}) differ from requested ({}, {})",
                    self.order1, self.order2, config.order1, config.order2
                )
            },
        )?;
        ensure(self.file_count() == registry.len(), || {
            format!(
                "index covers {} files, dataset has {}",
                self.file_count(),
                registry.len()
            )
        })?;
        ensure(self.total_particles == registry.total_particles(), || {
            format!(
                "index covers {} particles, dataset has {}",
                self.total_particles,
                registry.total_particles()
            )
        })?;
        ensure(self.domain == *domain, || {
            "index domain differs from dataset domain".to_owned()
        })?;
        ensure(
            self.is_refined() != config.flags.contains(BuildFlags::NO_REFINE),
            || "index refinement mode differs from requested".to_owned(),
        )
    }

    /// Load the persisted index for `dataset_path`, or build it and persist the result.
    ///
    /// A missing or rejected index file is rebuilt; rejection is logged, not returned.
    /// With [`BuildFlags::DONT_CACHE`] a freshly built index is not written back, and a
    /// failed write is logged without failing the build.
    pub fn load_or_build<S: CoordinateSource + ?Sized>(
        domain: Aabb3,
        registry: &DataFileRegistry,
        source: &S,
        config: &IndexConfig,
        dataset_path: &Path,
    ) -> Result<Self> {
        config.validate()?;
        let path = config.index_filename(dataset_path);
        match Self::load(&path, &domain, registry, config) {
            LoadOutcome::Loaded(index) => {
                info!(path = %path.display(), "loaded bitmap index");
                return Ok(index);
            }
            LoadOutcome::NotFound => debug!(path = %path.display(), "no persisted bitmap index"),
            LoadOutcome::Invalid(err) => {
                warn!(path = %path.display(), %err, "discarding persisted bitmap index");
            }
        }
        let index = Self::build(domain, registry, source, config)?;
        if config.flags.contains(BuildFlags::DONT_CACHE) {
            debug!("bitmap index caching disabled");
        } else if let Err(err) = index.save(&path) {
            warn!(path = %path.display(), %err, "could not persist bitmap index");
        }
        Ok(index)
    }
}
